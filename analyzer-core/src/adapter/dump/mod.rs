//! 静态 SQL dump 解析
//!
//! 不访问网络。dump 先被切分为语句（[`splitter`]），再逐条分类解析
//! （[`statement`]）；单条语句失败只计入跳过数，不中断整个解析。

mod splitter;
mod statement;

#[cfg(test)]
mod tests;

pub use splitter::{SqlStatement, split_statements};

use super::{DumpSource, Extraction, RawColumn, RawIndex, RawTable, implies_auto_increment};
use crate::config::DumpConfig;
use crate::constants::analysis::DUMP_FILE_EXTENSION;
use crate::dialect::SourceDialect;
use crate::error::{AnalyzerError, Result};
use crate::model::{ExtractionMode, SchemaObject, TableKind};
use statement::{AlterAction, DumpStatement, classify};
use tracing::{debug, info, warn};

/// 解析 dump 文本
pub fn parse_dump(source: &DumpSource, config: &DumpConfig) -> Result<Extraction> {
    if let Some(file_name) = &source.file_name {
        if !file_name.to_lowercase().ends_with(DUMP_FILE_EXTENSION) {
            return Err(AnalyzerError::unsupported(format!(
                "only {DUMP_FILE_EXTENSION} files are accepted, got '{file_name}'"
            )));
        }
    }

    let dialect = source
        .dialect
        .or(config.default_dialect)
        .unwrap_or_else(|| SourceDialect::detect(&source.sql));
    info!("开始解析 dump: 方言 {}", dialect);

    let statements = split_statements(&source.sql, dialect.family());
    debug!("切分出 {} 条语句", statements.len());

    let mut builder = DumpBuilder::new(dialect);
    for statement in &statements {
        let parsed = classify(statement, dialect)?;
        builder.apply(statement, parsed);
    }

    builder.finish(&config.database_name)
}

/// 按语句顺序累积表、对象与跳过数
struct DumpBuilder {
    dialect: SourceDialect,
    tables: Vec<RawTable>,
    objects: Vec<SchemaObject>,
    database: Option<String>,
    skipped: usize,
}

impl DumpBuilder {
    fn new(dialect: SourceDialect) -> Self {
        Self {
            dialect,
            tables: Vec::new(),
            objects: Vec::new(),
            database: None,
            skipped: 0,
        }
    }

    fn apply(&mut self, statement: &SqlStatement, parsed: DumpStatement) {
        match parsed {
            DumpStatement::CreateTable(mut table) => {
                self.drop_invalid_indexes(statement, &mut table);
                if let Some(existing) = self.find_table(&table.name) {
                    warn!("表 {} 重复定义 (第 {} 行)，以后者为准", table.name, statement.line);
                    *existing = table;
                } else {
                    self.tables.push(table);
                }
            }
            DumpStatement::CreateView(name) => {
                // mysqldump 会先建同名占位表，视图定义出现时替换
                let view = RawTable::new(name, TableKind::View);
                match self.find_table(&view.name) {
                    Some(existing) => *existing = view,
                    None => self.tables.push(view),
                }
            }
            DumpStatement::CreateIndex { table, index } => {
                self.add_index(statement, &table, index);
            }
            DumpStatement::AlterTable { table, actions } => {
                for action in actions {
                    self.apply_alter(statement, &table, action);
                }
            }
            DumpStatement::Comment {
                table,
                column,
                text,
            } => {
                let Some(target) = self.find_table(&table) else {
                    self.skip(statement, &format!("comment on unknown table '{table}'"));
                    return;
                };
                match column {
                    None => target.comment = text,
                    Some(column) => {
                        if let Some(col) = target.columns.iter_mut().find(|c| c.name == column) {
                            col.comment = text;
                        }
                    }
                }
            }
            DumpStatement::Object(object) => {
                debug!("发现 {}: {}", object.kind.as_str(), object.name);
                self.objects.push(object);
            }
            DumpStatement::Database { name, from_use } => {
                if from_use || self.database.is_none() {
                    self.database = Some(name);
                }
            }
            DumpStatement::Ignored => {}
            DumpStatement::Skipped(reason) => self.skip(statement, &reason),
        }
    }

    fn apply_alter(&mut self, statement: &SqlStatement, table: &str, action: AlterAction) {
        match action {
            AlterAction::AddIndex(index) => self.add_index(statement, table, index),
            AlterAction::SetDefault { column, value } => {
                let Some(col) = self.find_column(table, &column) else {
                    self.skip(statement, &format!("default for unknown column '{table}.{column}'"));
                    return;
                };
                if implies_auto_increment(&col.data_type, Some(&value)) {
                    col.auto_increment = true;
                }
                col.default_value = Some(value);
            }
            AlterAction::MarkAutoIncrement(column) => {
                if let Some(col) = self.find_column(table, &column) {
                    col.auto_increment = true;
                }
            }
        }
    }

    fn add_index(&mut self, statement: &SqlStatement, table: &str, index: RawIndex) {
        let case_sensitive = self.dialect.column_names_case_sensitive();
        let Some(target) = self.find_table(table) else {
            self.skip(statement, &format!("index on unknown table '{table}'"));
            return;
        };

        if index.primary && target.has_primary_index() {
            self.skip(statement, &format!("second primary key on table '{table}'"));
            return;
        }
        if target
            .indexes
            .iter()
            .any(|i| same_name(&i.name, &index.name, case_sensitive))
        {
            self.skip(statement, &format!("duplicate index '{}' on table '{table}'", index.name));
            return;
        }
        if let Some(column) = unknown_column(&target.columns, &index, case_sensitive) {
            let reason = format!(
                "index '{}' on table '{table}' references unknown column '{column}'",
                index.name
            );
            self.skip(statement, &reason);
            return;
        }

        if index.primary {
            // 主键列隐含 NOT NULL
            for column in target.columns.iter_mut() {
                if index.columns.iter().any(|c| same_name(c, &column.name, case_sensitive)) {
                    column.nullable = false;
                }
            }
        }
        target.indexes.push(index);
    }

    /// 建表语句里引用未知列、重复命名或多余主键的约束被丢弃，整条语句计一次跳过
    fn drop_invalid_indexes(&mut self, statement: &SqlStatement, table: &mut RawTable) {
        let case_sensitive = self.dialect.column_names_case_sensitive();
        let mut kept: Vec<RawIndex> = Vec::with_capacity(table.indexes.len());
        let mut dropped = Vec::new();

        for index in std::mem::take(&mut table.indexes) {
            let invalid = unknown_column(&table.columns, &index, case_sensitive).is_some()
                || (index.primary && kept.iter().any(|i| i.primary))
                || kept
                    .iter()
                    .any(|i| same_name(&i.name, &index.name, case_sensitive));
            if invalid {
                dropped.push(index.name);
            } else {
                kept.push(index);
            }
        }
        table.indexes = kept;

        if !dropped.is_empty() {
            let reason = format!(
                "invalid constraints on table '{}': {}",
                table.name,
                dropped.join(", ")
            );
            self.skip(statement, &reason);
        }
    }

    fn find_table(&mut self, name: &str) -> Option<&mut RawTable> {
        let case_sensitive = self.dialect.table_names_case_sensitive();
        self.tables.iter_mut().find(|t| {
            if case_sensitive {
                t.name == name
            } else {
                t.name.eq_ignore_ascii_case(name)
            }
        })
    }

    fn find_column(&mut self, table: &str, column: &str) -> Option<&mut RawColumn> {
        let case_sensitive = self.dialect.column_names_case_sensitive();
        self.find_table(table)?.columns.iter_mut().find(|c| {
            if case_sensitive {
                c.name == column
            } else {
                c.name.eq_ignore_ascii_case(column)
            }
        })
    }

    fn skip(&mut self, statement: &SqlStatement, reason: &str) {
        warn!("跳过第 {} 行的语句: {}", statement.line, reason);
        self.skipped += 1;
    }

    fn finish(self, default_database: &str) -> Result<Extraction> {
        if self.tables.is_empty() && self.skipped > 0 {
            return Err(AnalyzerError::parse(format!(
                "no tables could be extracted from the dump ({} statements skipped)",
                self.skipped
            )));
        }

        info!(
            "dump 解析完成: {} 个表, {} 个对象, 跳过 {} 条语句",
            self.tables.len(),
            self.objects.len(),
            self.skipped
        );

        Ok(Extraction {
            database: self
                .database
                .unwrap_or_else(|| default_database.to_string()),
            dialect: self.dialect,
            mode: ExtractionMode::Dump,
            tables: self.tables,
            objects: self.objects,
            skipped_statements: self.skipped,
        })
    }
}

/// 索引引用的第一个表中不存在的列
fn unknown_column<'a>(
    columns: &[RawColumn],
    index: &'a RawIndex,
    case_sensitive: bool,
) -> Option<&'a str> {
    index
        .columns
        .iter()
        .map(String::as_str)
        .find(|name| !columns.iter().any(|c| same_name(&c.name, name, case_sensitive)))
}

fn same_name(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.to_lowercase() == b.to_lowercase()
    }
}
