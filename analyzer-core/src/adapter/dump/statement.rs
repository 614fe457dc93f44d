use super::splitter::SqlStatement;
use crate::adapter::{RawColumn, RawIndex, RawTable, implies_auto_increment};
use crate::constants::live::{DEFAULT_MSSQL_SCHEMA, DEFAULT_POSTGRES_SCHEMA};
use crate::dialect::{DialectFamily, SourceDialect};
use crate::error::{AnalyzerError, Result};
use crate::model::{ObjectKind, SchemaObject, TableKind};
use once_cell::sync::Lazy;
use regex::Regex;
use sqlparser::ast::{ColumnDef, ColumnOption, Statement, TableConstraint};
use sqlparser::dialect::{Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;
use tracing::{debug, warn};

/// 单个标识符：反引号、双引号、方括号或裸标识符
const IDENT: &str = r#"(?:`[^`]+`|"(?:[^"]|"")+"|\[[^\]]+\]|[\w$#@]+)"#;

fn qualified_pattern() -> String {
    format!(r"{IDENT}(?:\s*\.\s*{IDENT})*")
}

fn build_regex(template: &str) -> Regex {
    let pattern = template.replace("{q}", &qualified_pattern());
    Regex::new(&pattern).expect("valid regex")
}

static CREATE_TABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(
        r"(?is)^CREATE\s+(?:OR\s+REPLACE\s+)?(?:(?:GLOBAL|LOCAL)\s+)?(?:TEMPORARY\s+|TEMP\s+|UNLOGGED\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?({q})\s*",
    )
});

static CREATE_VIEW_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(
        r"(?is)^CREATE\s+(?:OR\s+REPLACE\s+|OR\s+ALTER\s+)?(?:ALGORITHM\s*=\s*\w+\s+)?(?:DEFINER\s*=\s*\S+\s+)?(?:SQL\s+SECURITY\s+\w+\s+)?(?:MATERIALIZED\s+|TEMP\s+|TEMPORARY\s+|RECURSIVE\s+)?VIEW\s+(?:IF\s+NOT\s+EXISTS\s+)?({q})",
    )
});

static CREATE_INDEX_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(
        r"(?is)^CREATE\s+(UNIQUE\s+)?(?:(?:NON)?CLUSTERED\s+)?(?:(?:FULLTEXT|SPATIAL)\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?(?:({q})\s+)?(?:USING\s+\w+\s+)?ON\s+(?:ONLY\s+)?({q})\s*(?:USING\s+\w+\s*)?\(",
    )
});

static CREATE_OBJECT_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(
        r"(?is)^CREATE\s+(?:OR\s+REPLACE\s+|OR\s+ALTER\s+)?(?:DEFINER\s*=\s*\S+\s+)?(?:CONSTRAINT\s+)?(?:TRUSTED\s+)?(PROCEDURE|PROC|FUNCTION|TRIGGER|TYPE|DOMAIN|SEQUENCE|EXTENSION)\s+(?:IF\s+NOT\s+EXISTS\s+)?({q})",
    )
});

static TRIGGER_TABLE_REGEX: Lazy<Regex> = Lazy::new(|| build_regex(r"(?is)\bON\s+({q})"));

static CREATE_DATABASE_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(r"(?is)^CREATE\s+DATABASE\s+(?:IF\s+NOT\s+EXISTS\s+)?({q})")
});

static USE_REGEX: Lazy<Regex> = Lazy::new(|| build_regex(r"(?is)^USE\s+({q})\s*$"));

static ALTER_TABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(r"(?is)^ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?({q})\s+(.*)$")
});

static ADD_PRIMARY_KEY_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(
        r"(?is)^ADD\s+(?:CONSTRAINT\s+({q})\s+)?PRIMARY\s+KEY\s*(?:(?:NON)?CLUSTERED\s*)?(?:USING\s+\w+\s*)?\(",
    )
});

static ADD_UNIQUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(
        r"(?is)^ADD\s+(?:CONSTRAINT\s+({q})\s+)?UNIQUE\s*(?:KEY\s+|INDEX\s+)?(?:(?:NON)?CLUSTERED\s*)?(?:({q})\s*)?(?:USING\s+\w+\s*)?\(",
    )
});

static ADD_INDEX_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(
        r"(?is)^ADD\s+(?:FULLTEXT\s+|SPATIAL\s+)?(?:KEY|INDEX)\s+(?:({q})\s*)?(?:USING\s+\w+\s*)?\(",
    )
});

static SET_DEFAULT_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(r"(?is)^ALTER\s+(?:COLUMN\s+)?({q})\s+SET\s+DEFAULT\s+(.+)$")
});

static ADD_DEFAULT_FOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(r"(?is)^ADD\s+(?:CONSTRAINT\s+{q}\s+)?DEFAULT\s+(.+?)\s+FOR\s+({q})\s*$")
});

static MODIFY_AUTO_INCREMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(r"(?is)^(?:MODIFY|CHANGE)\s+(?:COLUMN\s+)?({q})\s+.*\bAUTO_INCREMENT\b")
});

static COMMENT_ON_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(r"(?is)^COMMENT\s+ON\s+(TABLE|COLUMN)\s+({q})\s+IS\s+(.+)$")
});

// 表体内无需解析的元素：外键、检查约束、全文/空间索引
static DROPPED_ELEMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(
        r"(?is)^(?:CONSTRAINT\s+{q}\s+)?(?:FOREIGN\s+KEY|CHECK|EXCLUDE)\b|^(?:FULLTEXT|SPATIAL)\b|^PERIOD\s+FOR\b",
    )
});

static KEY_ELEMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    build_regex(r"(?is)^(?:CONSTRAINT\s+{q}\s+)?(?:PRIMARY\s+KEY|UNIQUE|KEY|INDEX)\b")
});

static KEY_NOISE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:NON)?CLUSTERED\b|\bUSING\s+\w+").expect("valid regex")
});

static COLUMN_NOISE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bZEROFILL\b|\bNOT\s+FOR\s+REPLICATION\b|\bROWGUIDCOL\b|\bSPARSE\b")
        .expect("valid regex")
});

static DERIVED_TABLE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(?:AS\b|LIKE\b|PARTITION\s+OF\b|OF\b)").expect("valid regex")
});

static ENGINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bENGINE\s*=?\s*(\w+)").expect("valid regex"));

static CHARSET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:CHARSET|CHARACTER\s+SET)\s*=?\s*(\w+)").expect("valid regex")
});

static COLLATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bCOLLATE\s*=?\s*((?:\w+\.)?"[^"]+"|[\w.]+)"#).expect("valid regex")
});

static TABLE_COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bCOMMENT\s*=?\s*'((?:[^'\\]|''|\\.)*)'").expect("valid regex")
});

static HOUSEKEEPING_CREATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^CREATE\s+(?:OR\s+REPLACE\s+)?(?:SCHEMA|USER|ROLE|LOGIN|RULE|POLICY|PUBLICATION|SUBSCRIPTION|AGGREGATE|OPERATOR|CAST|COLLATION|SERVER|EVENT|TABLESPACE|STATISTICS|LANGUAGE|SYNONYM|TEXT\s+SEARCH|FOREIGN|DEFAULT|CONVERSION|ACCESS\s+METHOD)\b",
    )
    .expect("valid regex")
});

/// 不影响 schema 的常见语句
const HOUSEKEEPING_KEYWORDS: &[&str] = &[
    "SET", "DROP", "INSERT", "REPLACE", "UPDATE", "DELETE", "LOCK", "UNLOCK", "GRANT", "REVOKE",
    "SELECT", "COPY", "START", "BEGIN", "COMMIT", "ROLLBACK", "TRUNCATE", "FLUSH", "ANALYZE",
    "VACUUM", "PRINT", "EXEC", "EXECUTE", "DECLARE", "IF", "RAISERROR", "ALTER", "REFRESH",
    "SECURITY", "CHECKPOINT", "CALL", "DO", "REINDEX", "CLUSTER", "RESET", "SAVEPOINT", "RELEASE",
    "COMMENT", "WITH", "DBCC", "OPTIMIZE", "CHECKSUM",
];

/// 一条 dump 语句的分类结果
#[derive(Debug, Clone)]
pub enum DumpStatement {
    CreateTable(RawTable),
    CreateView(String),
    CreateIndex { table: String, index: RawIndex },
    AlterTable { table: String, actions: Vec<AlterAction> },
    Comment { table: String, column: Option<String>, text: Option<String> },
    Object(SchemaObject),
    Database { name: String, from_use: bool },
    /// 识别出但与 schema 无关
    Ignored,
    /// 无法解析，计入跳过数
    Skipped(String),
}

#[derive(Debug, Clone)]
pub enum AlterAction {
    AddIndex(RawIndex),
    SetDefault { column: String, value: String },
    MarkAutoIncrement(String),
}

/// 对单条语句分类并解析
///
/// 可恢复的失败返回 [`DumpStatement::Skipped`]；只有零列的基表返回 `Err`。
pub fn classify(statement: &SqlStatement, dialect: SourceDialect) -> Result<DumpStatement> {
    let text = statement.text.as_str();

    if let Some(caps) = CREATE_TABLE_REGEX.captures(text) {
        let body_start = caps.get(0).map(|m| m.end()).unwrap_or(text.len());
        return parse_create_table(statement, &caps[1], body_start, dialect);
    }

    if let Some(caps) = CREATE_VIEW_REGEX.captures(text) {
        return Ok(DumpStatement::CreateView(table_name(&caps[1], dialect)));
    }

    if let Some(caps) = CREATE_INDEX_REGEX.captures(text) {
        return Ok(parse_create_index(text, &caps, dialect));
    }

    if let Some(caps) = CREATE_OBJECT_REGEX.captures(text) {
        return Ok(DumpStatement::Object(parse_object(text, &caps, dialect)));
    }

    if let Some(caps) = CREATE_DATABASE_REGEX.captures(text) {
        return Ok(DumpStatement::Database {
            name: unqualified(&caps[1], dialect),
            from_use: false,
        });
    }

    if let Some(caps) = USE_REGEX.captures(text) {
        return Ok(DumpStatement::Database {
            name: unqualified(&caps[1], dialect),
            from_use: true,
        });
    }

    if let Some(caps) = ALTER_TABLE_REGEX.captures(text) {
        let table = table_name(&caps[1], dialect);
        let actions = split_top_level(&caps[2], dialect.family())
            .into_iter()
            .filter_map(|action| parse_alter_action(action.trim(), &table, dialect))
            .collect::<Vec<_>>();
        if actions.is_empty() {
            return Ok(DumpStatement::Ignored);
        }
        return Ok(DumpStatement::AlterTable { table, actions });
    }

    if let Some(caps) = COMMENT_ON_REGEX.captures(text) {
        return Ok(parse_comment(&caps, dialect));
    }

    if HOUSEKEEPING_CREATE_REGEX.is_match(text) {
        return Ok(DumpStatement::Ignored);
    }

    let keyword = text
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
        .to_uppercase();
    if HOUSEKEEPING_KEYWORDS.contains(&keyword.as_str()) {
        return Ok(DumpStatement::Ignored);
    }

    // 其余语句交给通用解析器判断是否为合法 SQL
    match Parser::parse_sql(&GenericDialect {}, text) {
        Ok(_) => Ok(DumpStatement::Ignored),
        Err(e) => Ok(DumpStatement::Skipped(format!("unrecognised statement: {e}"))),
    }
}

fn parse_create_table(
    statement: &SqlStatement,
    raw_name: &str,
    body_start: usize,
    dialect: SourceDialect,
) -> Result<DumpStatement> {
    let text = statement.text.as_str();
    let name = table_name(raw_name, dialect);
    let rest = &text[body_start..];

    if !rest.starts_with('(') {
        if DERIVED_TABLE_REGEX.is_match(rest) {
            return Ok(DumpStatement::Skipped(format!(
                "table '{name}' is derived from another object, columns unavailable"
            )));
        }
        return Ok(DumpStatement::Skipped(format!("table '{name}' has no column list")));
    }

    let Some(body_end) = matching_paren(text, body_start, dialect.family()) else {
        return Ok(DumpStatement::Skipped(format!(
            "unbalanced parentheses in table '{name}'"
        )));
    };

    let elements = split_top_level(&text[body_start + 1..body_end], dialect.family())
        .into_iter()
        .map(str::trim)
        .filter(|element| !element.is_empty())
        .filter(|element| !DROPPED_ELEMENT_REGEX.is_match(element))
        .map(|element| normalize_element(element, dialect.family()))
        .collect::<Vec<_>>();

    if elements.is_empty() {
        return Err(AnalyzerError::parse(format!(
            "table '{name}' has no columns (line {})",
            statement.line
        )));
    }

    let create_sql = format!(
        "{}(\n  {}\n)",
        &text[..body_start],
        elements.join(",\n  ")
    );
    let tail = &text[body_end + 1..];

    let create_table = match parse_with_fallback(&create_sql, dialect) {
        Ok(statements) => statements.into_iter().find_map(|statement| match statement {
            Statement::CreateTable(create_table) => Some(create_table),
            _ => None,
        }),
        Err(e) => {
            warn!("解析 CREATE TABLE 失败 (第 {} 行): {} - 错误: {}", statement.line, name, e);
            return Ok(DumpStatement::Skipped(format!("cannot parse table '{name}': {e}")));
        }
    };
    let Some(create_table) = create_table else {
        return Ok(DumpStatement::Skipped(format!("cannot parse table '{name}'")));
    };

    if create_table.columns.is_empty() {
        return Err(AnalyzerError::parse(format!(
            "table '{name}' has no columns (line {})",
            statement.line
        )));
    }

    debug!("解析表: {} ({} 列)", name, create_table.columns.len());

    let mut table = RawTable::new(name, TableKind::BaseTable);
    let mut primary_key_columns = Vec::new();

    for column in &create_table.columns {
        let (raw_column, column_key) = parse_column_definition(column, dialect);
        match column_key {
            ColumnKey::Primary => primary_key_columns.push(raw_column.name.clone()),
            ColumnKey::Unique => table.indexes.push(RawIndex {
                name: format!("{}_{}_key", short_name(&table.name), raw_column.name),
                columns: vec![raw_column.name.clone()],
                unique: true,
                primary: false,
            }),
            ColumnKey::None => {}
        }
        table.columns.push(raw_column);
    }

    // 列级主键合并为一个主键索引
    if !primary_key_columns.is_empty() {
        table.indexes.insert(
            0,
            RawIndex {
                name: "PRIMARY".to_string(),
                columns: primary_key_columns,
                unique: true,
                primary: true,
            },
        );
    }

    for constraint in &create_table.constraints {
        if let Some(index) = parse_table_constraint(constraint, &table.name, dialect) {
            table.indexes.push(index);
        }
    }

    apply_table_options(&mut table, tail);

    Ok(DumpStatement::CreateTable(table))
}

fn parse_with_fallback(
    sql: &str,
    dialect: SourceDialect,
) -> std::result::Result<Vec<Statement>, sqlparser::parser::ParserError> {
    let native: Box<dyn Dialect> = match dialect.family() {
        DialectFamily::Mysql => Box::new(MySqlDialect {}),
        DialectFamily::Postgres => Box::new(PostgreSqlDialect {}),
        DialectFamily::Mssql => Box::new(MsSqlDialect {}),
    };

    Parser::parse_sql(native.as_ref(), sql).or_else(|native_err| {
        debug!("方言解析失败，尝试通用解析器: {}", native_err);
        Parser::parse_sql(&GenericDialect {}, sql).map_err(|_| native_err)
    })
}

/// 去掉解析器不需要的修饰：索引元素只保留列名列表，列元素去掉 ZEROFILL 等
fn normalize_element(element: &str, family: DialectFamily) -> String {
    if !KEY_ELEMENT_REGEX.is_match(element) {
        return COLUMN_NOISE_REGEX.replace_all(element, "").trim().to_string();
    }

    let Some(open) = element.find('(') else {
        return element.to_string();
    };
    let Some(close) = matching_paren(element, open, family) else {
        return element.to_string();
    };

    let head = KEY_NOISE_REGEX.replace_all(&element[..open], " ");
    let columns = split_top_level(&element[open + 1..close], family)
        .into_iter()
        .map(|column| leading_identifier(column).unwrap_or(column.trim()).to_string())
        .collect::<Vec<_>>();

    format!("{} ({})", head.trim(), columns.join(", "))
}

enum ColumnKey {
    Primary,
    Unique,
    None,
}

/// 解析列定义
fn parse_column_definition(column: &ColumnDef, dialect: SourceDialect) -> (RawColumn, ColumnKey) {
    let data_type = column.data_type.to_string();
    let mut nullable = true;
    let mut default_value = None;
    let mut comment = None;
    let mut auto_increment = false;
    let mut key = ColumnKey::None;

    // 检查列选项
    for option in &column.options {
        match &option.option {
            ColumnOption::NotNull => nullable = false,
            ColumnOption::Null => nullable = true,
            ColumnOption::Default(expr) => default_value = Some(expr.to_string()),
            ColumnOption::Comment(c) => comment = Some(c.clone()),
            ColumnOption::Unique { is_primary, .. } => {
                if *is_primary {
                    nullable = false;
                    key = ColumnKey::Primary;
                } else {
                    key = ColumnKey::Unique;
                }
            }
            other => {
                let option_text = other.to_string().to_uppercase();
                if option_text.contains("AUTO_INCREMENT")
                    || option_text.contains("AUTOINCREMENT")
                    || option_text.contains("IDENTITY")
                {
                    auto_increment = true;
                }
            }
        }
    }

    if implies_auto_increment(&data_type, default_value.as_deref()) {
        auto_increment = true;
    }

    let definition = column.to_string();
    let collation = COLLATE_REGEX
        .captures(&definition)
        .map(|caps| caps[1].to_string())
        .or_else(|| CHARSET_REGEX.captures(&definition).map(|caps| caps[1].to_string()))
        .filter(|c| !c.to_lowercase().contains("default"));

    let name = match dialect.family() {
        DialectFamily::Postgres if column.name.quote_style.is_none() => {
            column.name.value.to_lowercase()
        }
        _ => column.name.value.clone(),
    };

    let raw = RawColumn {
        name,
        data_type,
        nullable,
        default_value,
        auto_increment,
        comment,
        collation,
    };
    (raw, key)
}

/// 解析表约束
fn parse_table_constraint(
    constraint: &TableConstraint,
    table: &str,
    dialect: SourceDialect,
) -> Option<RawIndex> {
    match constraint {
        TableConstraint::PrimaryKey { name, columns, .. } => Some(RawIndex {
            name: name
                .as_ref()
                .map(|n| unqualified(&n.to_string(), dialect))
                .unwrap_or_else(|| "PRIMARY".to_string()),
            columns: index_columns(columns.iter().map(|c| c.to_string()), dialect)?,
            unique: true,
            primary: true,
        }),
        TableConstraint::Unique { name, columns, .. } => {
            let columns = index_columns(columns.iter().map(|c| c.to_string()), dialect)?;
            Some(RawIndex {
                name: name
                    .as_ref()
                    .map(|n| unqualified(&n.to_string(), dialect))
                    .unwrap_or_else(|| format!("{}_{}_key", short_name(table), columns.join("_"))),
                columns,
                unique: true,
                primary: false,
            })
        }
        TableConstraint::Index { name, columns, .. } => {
            let columns = index_columns(columns.iter().map(|c| c.to_string()), dialect)?;
            Some(RawIndex {
                // MySQL 未命名索引以首列命名
                name: name
                    .as_ref()
                    .map(|n| unqualified(&n.to_string(), dialect))
                    .unwrap_or_else(|| columns[0].clone()),
                columns,
                unique: false,
                primary: false,
            })
        }
        _ => None,
    }
}

/// 表选项：ENGINE / CHARSET / COLLATE / COMMENT
fn apply_table_options(table: &mut RawTable, tail: &str) {
    table.engine = ENGINE_REGEX.captures(tail).map(|caps| caps[1].to_string());
    table.collation = COLLATE_REGEX
        .captures(tail)
        .map(|caps| caps[1].to_string())
        .or_else(|| CHARSET_REGEX.captures(tail).map(|caps| caps[1].to_string()));
    table.comment = TABLE_COMMENT_REGEX
        .captures(tail)
        .map(|caps| unescape_literal(&caps[1]))
        .filter(|c| !c.is_empty());
}

fn parse_create_index(text: &str, caps: &regex::Captures<'_>, dialect: SourceDialect) -> DumpStatement {
    let table = table_name(&caps[3], dialect);
    let open = caps.get(0).map(|m| m.end() - 1).unwrap_or(text.len());
    let Some(columns) = paren_columns(text, open, dialect) else {
        debug!("跳过表达式索引: {}", text);
        return DumpStatement::Ignored;
    };

    let name = caps
        .get(2)
        .map(|m| unqualified(m.as_str(), dialect))
        .unwrap_or_else(|| format!("{}_{}_idx", short_name(&table), columns.join("_")));

    DumpStatement::CreateIndex {
        table,
        index: RawIndex {
            name,
            columns,
            unique: caps.get(1).is_some(),
            primary: false,
        },
    }
}

fn parse_alter_action(action: &str, table: &str, dialect: SourceDialect) -> Option<AlterAction> {
    if let Some(caps) = ADD_PRIMARY_KEY_REGEX.captures(action) {
        let open = caps.get(0)?.end() - 1;
        return Some(AlterAction::AddIndex(RawIndex {
            name: caps
                .get(1)
                .map(|m| unqualified(m.as_str(), dialect))
                .unwrap_or_else(|| "PRIMARY".to_string()),
            columns: paren_columns(action, open, dialect)?,
            unique: true,
            primary: true,
        }));
    }

    if let Some(caps) = ADD_UNIQUE_REGEX.captures(action) {
        let open = caps.get(0)?.end() - 1;
        let columns = paren_columns(action, open, dialect)?;
        let name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| unqualified(m.as_str(), dialect))
            .unwrap_or_else(|| format!("{}_{}_key", short_name(table), columns.join("_")));
        return Some(AlterAction::AddIndex(RawIndex {
            name,
            columns,
            unique: true,
            primary: false,
        }));
    }

    if let Some(caps) = ADD_INDEX_REGEX.captures(action) {
        let open = caps.get(0)?.end() - 1;
        let columns = paren_columns(action, open, dialect)?;
        let name = caps
            .get(1)
            .map(|m| unqualified(m.as_str(), dialect))
            .unwrap_or_else(|| columns[0].clone());
        return Some(AlterAction::AddIndex(RawIndex {
            name,
            columns,
            unique: false,
            primary: false,
        }));
    }

    if let Some(caps) = SET_DEFAULT_REGEX.captures(action) {
        return Some(AlterAction::SetDefault {
            column: unqualified(&caps[1], dialect),
            value: caps[2].trim().to_string(),
        });
    }

    if let Some(caps) = ADD_DEFAULT_FOR_REGEX.captures(action) {
        return Some(AlterAction::SetDefault {
            column: unqualified(&caps[2], dialect),
            value: caps[1].trim().to_string(),
        });
    }

    if let Some(caps) = MODIFY_AUTO_INCREMENT_REGEX.captures(action) {
        return Some(AlterAction::MarkAutoIncrement(unqualified(&caps[1], dialect)));
    }

    None
}

fn parse_object(text: &str, caps: &regex::Captures<'_>, dialect: SourceDialect) -> SchemaObject {
    let kind = match caps[1].to_uppercase().as_str() {
        "PROCEDURE" | "PROC" => ObjectKind::Procedure,
        "FUNCTION" => ObjectKind::Function,
        "TRIGGER" => ObjectKind::Trigger,
        "TYPE" => ObjectKind::Type,
        "DOMAIN" => ObjectKind::Domain,
        "SEQUENCE" => ObjectKind::Sequence,
        _ => ObjectKind::Extension,
    };

    let table = match kind {
        ObjectKind::Trigger => caps
            .get(2)
            .and_then(|m| TRIGGER_TABLE_REGEX.captures(&text[m.end()..]))
            .map(|on| table_name(&on[1], dialect)),
        _ => None,
    };

    SchemaObject {
        kind,
        name: unqualified(&caps[2], dialect),
        table,
    }
}

fn parse_comment(caps: &regex::Captures<'_>, dialect: SourceDialect) -> DumpStatement {
    let value = caps[3].trim();
    let text = if value.eq_ignore_ascii_case("NULL") {
        None
    } else {
        let literal = value.strip_prefix(['E', 'N']).unwrap_or(value);
        literal
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .map(unescape_literal)
    };

    if caps[1].eq_ignore_ascii_case("TABLE") {
        return DumpStatement::Comment {
            table: table_name(&caps[2], dialect),
            column: None,
            text,
        };
    }

    let mut parts = split_qualified(&caps[2], dialect);
    let Some(column) = parts.pop() else {
        return DumpStatement::Ignored;
    };
    if parts.is_empty() {
        return DumpStatement::Ignored;
    }
    DumpStatement::Comment {
        table: table_name_from_parts(&parts, dialect),
        column: Some(column),
        text,
    }
}

/// 从 `(` 位置读取索引列；任一列为表达式时返回 None
fn paren_columns(text: &str, open: usize, dialect: SourceDialect) -> Option<Vec<String>> {
    let close = matching_paren(text, open, dialect.family())?;
    let columns = split_top_level(&text[open + 1..close], dialect.family());
    index_columns(columns.into_iter().map(str::to_string), dialect)
}

fn index_columns(
    columns: impl Iterator<Item = String>,
    dialect: SourceDialect,
) -> Option<Vec<String>> {
    let columns = columns
        .map(|c| leading_identifier(&c).map(|ident| fold_identifier(ident, dialect)))
        .collect::<Option<Vec<_>>>()?;
    if columns.is_empty() { None } else { Some(columns) }
}

/// 索引列开头的标识符（保留引号）；`col(10)` 前缀长度被忽略，函数表达式返回 None
fn leading_identifier(column: &str) -> Option<&str> {
    let column = column.trim();
    let first = column.chars().next()?;
    let end = match first {
        '`' | '"' => column[1..].find(first).map(|p| p + 2)?,
        '[' => column.find(']').map(|p| p + 1)?,
        c if c.is_alphanumeric() || c == '_' => column
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_' || *c == '$'))
            .map(|(i, _)| i)
            .unwrap_or(column.len()),
        _ => return None,
    };

    let rest = column[end..].trim_start();
    if let Some(args) = rest.strip_prefix('(') {
        let is_prefix_length = args
            .split(')')
            .next()
            .map(|n| n.trim().chars().all(|c| c.is_ascii_digit()))
            .unwrap_or(false);
        if !is_prefix_length {
            return None;
        }
    }
    Some(&column[..end])
}

/// 从 `open`（必须是 `(`）找到配对的 `)`，跳过引号内容
pub(crate) fn matching_paren(text: &str, open: usize, family: DialectFamily) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in text[open..].char_indices() {
        if let Some(q) = quote {
            quote = close_quote(q, ch, family, &mut escaped);
            continue;
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// 按顶层逗号切分（忽略括号与引号内的逗号）
fn split_top_level(text: &str, family: DialectFamily) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        if let Some(q) = quote {
            quote = close_quote(q, ch, family, &mut escaped);
            continue;
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// 引号内的一个字符；返回之后仍处于的引号。MySQL 字符串里 `\` 转义下一个字符
fn close_quote(quote: char, ch: char, family: DialectFamily, escaped: &mut bool) -> Option<char> {
    if *escaped {
        *escaped = false;
        return Some(quote);
    }
    if ch == '\\' && quote == '\'' && family == DialectFamily::Mysql {
        *escaped = true;
        return Some(quote);
    }
    if ch == quote { None } else { Some(quote) }
}

/// 按 `.` 拆分限定名并去掉引号
pub(crate) fn split_qualified(name: &str, dialect: SourceDialect) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut closing: Option<char> = None;

    for ch in name.trim().chars() {
        match closing {
            Some(close) => {
                current.push(ch);
                if ch == close {
                    closing = None;
                }
            }
            None => match ch {
                '`' => {
                    closing = Some('`');
                    current.push(ch);
                }
                '"' => {
                    closing = Some('"');
                    current.push(ch);
                }
                '[' => {
                    closing = Some(']');
                    current.push(ch);
                }
                '.' => parts.push(fold_identifier(std::mem::take(&mut current).trim(), dialect)),
                c if c.is_whitespace() => {}
                _ => current.push(ch),
            },
        }
    }
    parts.push(fold_identifier(current.trim(), dialect));
    parts
}

/// 去掉引号；PostgreSQL 未加引号的标识符折叠为小写
pub(crate) fn fold_identifier(ident: &str, dialect: SourceDialect) -> String {
    let ident = ident.trim();
    let quoted = ident.starts_with(['"', '`', '[']);
    let name = unquote(ident);
    if !quoted && dialect.family() == DialectFamily::Postgres {
        name.to_lowercase()
    } else {
        name
    }
}

fn unquote(ident: &str) -> String {
    let ident = ident.trim();
    let inner = ident
        .strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
        .or_else(|| ident.strip_prefix('[').and_then(|s| s.strip_suffix(']')))
        .map(str::to_string)
        .or_else(|| {
            ident
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .map(|s| s.replace("\"\"", "\""))
        });
    inner.unwrap_or_else(|| ident.to_string())
}

/// 限定名的最后一段
fn unqualified(name: &str, dialect: SourceDialect) -> String {
    split_qualified(name, dialect).pop().unwrap_or_default()
}

/// 表名：默认 schema（public / dbo）与 MySQL 库名前缀被去掉，其余 schema 保留
pub(crate) fn table_name(name: &str, dialect: SourceDialect) -> String {
    table_name_from_parts(&split_qualified(name, dialect), dialect)
}

fn table_name_from_parts(parts: &[String], dialect: SourceDialect) -> String {
    let Some(table) = parts.last() else {
        return String::new();
    };
    if parts.len() < 2 {
        return table.clone();
    }

    let schema = &parts[parts.len() - 2];
    let keep_schema = match dialect.family() {
        DialectFamily::Mysql => false,
        DialectFamily::Postgres => schema != DEFAULT_POSTGRES_SCHEMA,
        DialectFamily::Mssql => !schema.eq_ignore_ascii_case(DEFAULT_MSSQL_SCHEMA),
    };
    if keep_schema {
        format!("{schema}.{table}")
    } else {
        table.clone()
    }
}

/// 生成名字时去掉 schema 前缀
fn short_name(table: &str) -> &str {
    table.rsplit('.').next().unwrap_or(table)
}

fn unescape_literal(value: &str) -> String {
    value.replace("''", "'").replace("\\'", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(text: &str) -> SqlStatement {
        SqlStatement {
            text: text.to_string(),
            line: 1,
        }
    }

    fn create_table(text: &str, dialect: SourceDialect) -> RawTable {
        match classify(&statement(text), dialect).unwrap() {
            DumpStatement::CreateTable(table) => table,
            other => panic!("expected CREATE TABLE, got {other:?}"),
        }
    }

    #[test]
    fn test_mysql_create_table_with_keys_and_options() {
        let table = create_table(
            "CREATE TABLE `users` (
  `id` int(11) unsigned NOT NULL AUTO_INCREMENT,
  `email` varchar(255) CHARACTER SET latin1 NOT NULL COMMENT 'login, unique',
  `status` enum('active','banned') DEFAULT 'active',
  `bio` text,
  PRIMARY KEY (`id`),
  UNIQUE KEY `uniq_email` (`email`),
  KEY `idx_status_email` (`status`,`email`(10)),
  CONSTRAINT `fk_x` FOREIGN KEY (`id`) REFERENCES `other` (`id`)
) ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci COMMENT='App users'",
            SourceDialect::Mysql,
        );

        assert_eq!(table.name, "users");
        assert_eq!(table.columns.len(), 4);
        assert!(table.columns[0].auto_increment);
        assert!(!table.columns[0].nullable);
        assert_eq!(table.columns[1].comment.as_deref(), Some("login, unique"));
        assert_eq!(table.columns[1].collation.as_deref(), Some("latin1"));
        assert_eq!(table.columns[2].default_value.as_deref(), Some("'active'"));
        assert!(table.columns[3].nullable);

        assert_eq!(table.indexes.len(), 3);
        assert!(table.indexes[0].primary);
        assert_eq!(table.indexes[0].columns, vec!["id"]);
        assert_eq!(table.indexes[1].name, "uniq_email");
        assert!(table.indexes[1].unique);
        assert_eq!(table.indexes[2].columns, vec!["status", "email"]);

        assert_eq!(table.engine.as_deref(), Some("InnoDB"));
        assert_eq!(table.collation.as_deref(), Some("utf8mb4_unicode_ci"));
        assert_eq!(table.comment.as_deref(), Some("App users"));
    }

    #[test]
    fn test_postgres_create_table_inline_primary_key() {
        let table = create_table(
            "CREATE TABLE public.orders (
    id bigserial PRIMARY KEY,
    total numeric(12,2) NOT NULL,
    placed_at timestamp with time zone DEFAULT now(),
    CONSTRAINT orders_total_check CHECK (total >= 0)
)",
            SourceDialect::Postgres,
        );

        assert_eq!(table.name, "orders");
        assert!(table.columns[0].auto_increment);
        assert_eq!(table.indexes[0].columns, vec!["id"]);
        assert!(table.indexes[0].primary);
        assert!(table.columns[2].data_type.to_lowercase().contains("time zone"));
    }

    #[test]
    fn test_mssql_create_table_with_clustered_primary_key() {
        let table = create_table(
            "CREATE TABLE [dbo].[customers](
	[id] [int] IDENTITY(1,1) NOT NULL,
	[name] [nvarchar](100) COLLATE SQL_Latin1_General_CP1_CI_AS NULL,
 CONSTRAINT [PK_customers] PRIMARY KEY CLUSTERED
(
	[id] ASC
)WITH (PAD_INDEX = OFF, STATISTICS_NORECOMPUTE = OFF) ON [PRIMARY]
) ON [PRIMARY]",
            SourceDialect::Mssql,
        );

        assert_eq!(table.name, "customers");
        assert!(table.columns[0].auto_increment);
        assert_eq!(table.indexes.len(), 1);
        assert_eq!(table.indexes[0].name, "PK_customers");
        assert_eq!(table.indexes[0].columns, vec!["id"]);
        assert_eq!(
            table.columns[1].collation.as_deref(),
            Some("SQL_Latin1_General_CP1_CI_AS")
        );
    }

    #[test]
    fn test_mysql_backslash_escaped_quote_in_comment() {
        let table = create_table(
            r"CREATE TABLE `notes` (
  `id` int NOT NULL,
  `body` text COMMENT 'it\'s (really) fine, ok',
  PRIMARY KEY (`id`)
) ENGINE=InnoDB",
            SourceDialect::Mysql,
        );
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[1].name, "body");
        assert!(table.columns[1].comment.as_deref().is_some_and(|c| c.contains("(really) fine")));
        assert!(table.indexes[0].primary);
    }

    #[test]
    fn test_backslash_is_literal_outside_mysql() {
        let text = r"('C:\', x)";
        assert_eq!(matching_paren(text, 0, DialectFamily::Postgres), Some(text.len() - 1));
        assert_eq!(split_top_level(r"'C:\', x", DialectFamily::Postgres).len(), 2);
        assert_eq!(split_top_level(r"'a\', b', c", DialectFamily::Mysql).len(), 2);
    }

    #[test]
    fn test_malformed_create_table_is_skipped() {
        let result = classify(
            &statement("CREATE TABLE broken (id INT,, name"),
            SourceDialect::Mysql,
        )
        .unwrap();
        assert!(matches!(result, DumpStatement::Skipped(_)));
    }

    #[test]
    fn test_zero_column_table_is_parse_error() {
        let err = classify(&statement("CREATE TABLE empty_t ()"), SourceDialect::Postgres)
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Parse(_)));
    }

    #[test]
    fn test_create_table_as_select_is_skipped() {
        let result = classify(
            &statement("CREATE TABLE t2 AS SELECT * FROM t1"),
            SourceDialect::Postgres,
        )
        .unwrap();
        assert!(matches!(result, DumpStatement::Skipped(_)));
    }

    #[test]
    fn test_alter_table_actions() {
        let result = classify(
            &statement(
                "ALTER TABLE `users` ADD PRIMARY KEY (`id`), ADD UNIQUE KEY `uniq_email` (`email`), ADD KEY `idx_name` (`name`), MODIFY `id` int(11) NOT NULL AUTO_INCREMENT",
            ),
            SourceDialect::Mysql,
        )
        .unwrap();

        let DumpStatement::AlterTable { table, actions } = result else {
            panic!("expected ALTER TABLE");
        };
        assert_eq!(table, "users");
        assert_eq!(actions.len(), 4);
        assert!(matches!(&actions[0], AlterAction::AddIndex(i) if i.primary && i.columns == vec!["id"]));
        assert!(matches!(&actions[1], AlterAction::AddIndex(i) if i.unique && i.name == "uniq_email"));
        assert!(matches!(&actions[2], AlterAction::AddIndex(i) if !i.unique && i.name == "idx_name"));
        assert!(matches!(&actions[3], AlterAction::MarkAutoIncrement(c) if c == "id"));
    }

    #[test]
    fn test_postgres_alter_constraint_and_default() {
        let result = classify(
            &statement("ALTER TABLE ONLY public.users ADD CONSTRAINT users_pkey PRIMARY KEY (id)"),
            SourceDialect::Postgres,
        )
        .unwrap();
        let DumpStatement::AlterTable { actions, .. } = result else {
            panic!("expected ALTER TABLE");
        };
        assert!(matches!(&actions[0], AlterAction::AddIndex(i) if i.name == "users_pkey"));

        let result = classify(
            &statement(
                "ALTER TABLE ONLY public.users ALTER COLUMN id SET DEFAULT nextval('public.users_id_seq'::regclass)",
            ),
            SourceDialect::Postgres,
        )
        .unwrap();
        let DumpStatement::AlterTable { actions, .. } = result else {
            panic!("expected ALTER TABLE");
        };
        assert!(matches!(&actions[0], AlterAction::SetDefault { column, value } if column == "id" && value.starts_with("nextval")));

        let result = classify(
            &statement("ALTER TABLE public.users OWNER TO postgres"),
            SourceDialect::Postgres,
        )
        .unwrap();
        assert!(matches!(result, DumpStatement::Ignored));
    }

    #[test]
    fn test_create_index_and_expression_index() {
        let result = classify(
            &statement("CREATE UNIQUE INDEX users_email_idx ON public.users USING btree (email)"),
            SourceDialect::Postgres,
        )
        .unwrap();
        let DumpStatement::CreateIndex { table, index } = result else {
            panic!("expected CREATE INDEX");
        };
        assert_eq!(table, "users");
        assert!(index.unique);
        assert_eq!(index.columns, vec!["email"]);

        let result = classify(
            &statement("CREATE INDEX users_lower_email ON users (lower(email))"),
            SourceDialect::Postgres,
        )
        .unwrap();
        assert!(matches!(result, DumpStatement::Ignored));
    }

    #[test]
    fn test_views_objects_and_database_names() {
        let view = classify(
            &statement("CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`localhost` SQL SECURITY DEFINER VIEW `active_users` AS select 1 AS `id`"),
            SourceDialect::Mysql,
        )
        .unwrap();
        assert!(matches!(view, DumpStatement::CreateView(name) if name == "active_users"));

        let trigger = classify(
            &statement("CREATE TRIGGER audit_users AFTER INSERT ON public.users FOR EACH ROW EXECUTE FUNCTION audit()"),
            SourceDialect::Postgres,
        )
        .unwrap();
        assert!(matches!(
            trigger,
            DumpStatement::Object(SchemaObject { kind: ObjectKind::Trigger, ref name, table: Some(ref t) })
                if name == "audit_users" && t == "users"
        ));

        let extension = classify(
            &statement("CREATE EXTENSION IF NOT EXISTS postgis WITH SCHEMA public"),
            SourceDialect::Postgres,
        )
        .unwrap();
        assert!(matches!(extension, DumpStatement::Object(SchemaObject { kind: ObjectKind::Extension, .. })));

        let database = classify(&statement("USE `shop`"), SourceDialect::Mysql).unwrap();
        assert!(matches!(database, DumpStatement::Database { name, from_use: true } if name == "shop"));
    }

    #[test]
    fn test_comment_on_column() {
        let result = classify(
            &statement("COMMENT ON COLUMN public.users.email IS 'Primary contact, it''s unique'"),
            SourceDialect::Postgres,
        )
        .unwrap();
        assert!(matches!(
            result,
            DumpStatement::Comment { table, column: Some(column), text: Some(text) }
                if table == "users" && column == "email" && text == "Primary contact, it's unique"
        ));
    }

    #[test]
    fn test_housekeeping_and_garbage() {
        for sql in [
            "SET NAMES utf8mb4",
            "DROP TABLE IF EXISTS `users`",
            "LOCK TABLES `users` WRITE",
            "INSERT INTO t VALUES (1)",
            "CREATE SCHEMA sales",
        ] {
            assert!(matches!(
                classify(&statement(sql), SourceDialect::Mysql).unwrap(),
                DumpStatement::Ignored
            ));
        }

        let garbage = classify(&statement("THIS IS NOT SQL AT ALL"), SourceDialect::Mysql).unwrap();
        assert!(matches!(garbage, DumpStatement::Skipped(_)));
    }

    #[test]
    fn test_qualified_names() {
        assert_eq!(
            split_qualified("[dbo].[Order Details]", SourceDialect::Mssql),
            vec!["dbo", "Order Details"]
        );
        assert_eq!(table_name("\"sales\".\"orders\"", SourceDialect::Postgres), "sales.orders");
        assert_eq!(table_name("`shop`.`orders`", SourceDialect::Mysql), "orders");
        assert_eq!(table_name("DBO.orders", SourceDialect::Mssql), "orders");
    }
}
