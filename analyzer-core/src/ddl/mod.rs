//! 目标库 DDL 生成
//!
//! 输出只依赖模型内容：相同模型得到逐字节相同的文本。所有来自源库的文本
//! （注释、默认值）都去掉控制字符后再写出。

mod default_value;
mod identifier;

use crate::dialect::{DialectFamily, TargetDialect};
use crate::mapping::map_type;
use crate::model::{Column, ExtractionMode, Index, SchemaModel, Table};
use default_value::{translate_catalog_default, translate_default};
use identifier::{quote_identifier, quote_identifiers, string_literal, strip_control};
use tracing::debug;

const SECTION_RULE: &str = "-- =============================================";

/// 为模型中的全部基表生成建表语句
pub fn generate(model: &SchemaModel, target: TargetDialect) -> String {
    let mut lines = vec![
        format!(
            "-- {} DDL generated from {} schema",
            target.display_name(),
            model.source_dialect
        ),
        format!("-- Source database: {}", strip_control(&model.database)),
    ];

    let table_count = model.base_table_count();
    if table_count == 0 {
        lines.push("-- No tables found in schema".to_string());
        return finish(lines);
    }

    lines.push(format!("-- Tables: {table_count}"));
    lines.push(String::new());
    lines.push(SECTION_RULE.to_string());
    lines.push("-- TABLE DEFINITIONS".to_string());
    lines.push(SECTION_RULE.to_string());

    for table in model.base_tables() {
        debug!("生成表 {} 的 DDL", table.name);
        lines.push(String::new());
        lines.extend(provenance_block(model, target, table));
        lines.push(generate_create_table_sql(model, target, table));
    }

    lines.push(String::new());
    lines.push("-- End of DDL".to_string());
    finish(lines)
}

fn finish(lines: Vec<String>) -> String {
    let mut ddl = lines.join("\n");
    ddl.push('\n');
    ddl
}

/// 表前的来源说明：源方言、存储引擎、行数估计、未迁移的索引和默认值
fn provenance_block(model: &SchemaModel, target: TargetDialect, table: &Table) -> Vec<String> {
    let mut lines = vec![format!(
        "-- Table: {} ({} columns, ~{} rows)",
        strip_control(&table.name),
        table.columns.len(),
        table.row_count
    )];

    match &table.engine {
        Some(engine) => lines.push(format!(
            "-- Source: {} table, engine {}",
            model.source_dialect,
            strip_control(engine)
        )),
        None => lines.push(format!("-- Source: {} table", model.source_dialect)),
    }

    for index in table.secondary_indexes() {
        lines.push(format!(
            "-- Index {} not created: {} has no secondary indexes",
            describe_index(index),
            target.display_name()
        ));
    }

    for column in &table.columns {
        let Some(raw) = column.default_value.as_deref() else {
            continue;
        };
        if column.auto_increment {
            continue;
        }
        let target_type = map_type(model.source_dialect, target, &column.source_type).target_type;
        if column_default(model, raw, &target_type).is_none() {
            lines.push(format!(
                "-- Default not carried over: {} = {}",
                strip_control(&column.name),
                strip_control(raw)
            ));
        }
    }

    lines
}

fn describe_index(index: &Index) -> String {
    let kind = if index.unique { "unique " } else { "" };
    format!(
        "{}{} ({})",
        kind,
        strip_control(&index.name),
        strip_control(&index.columns.join(", "))
    )
}

/// 生成 CREATE TABLE 语句
pub fn generate_create_table_sql(model: &SchemaModel, target: TargetDialect, table: &Table) -> String {
    let mut parts: Vec<String> = table
        .columns
        .iter()
        .map(|column| format!("    {}", generate_column_sql(model, target, column)))
        .collect();

    if let Some(primary_key) = table.primary_key() {
        parts.push(format!(
            "    PRIMARY KEY ({})",
            quote_identifiers(&primary_key.columns)
        ));
    }

    let mut sql = format!("CREATE TABLE {} (\n", quote_identifier(&table.name));
    sql.push_str(&parts.join(",\n"));
    sql.push_str("\n)");

    if let Some(columns) = clustering_columns(table) {
        sql.push_str(&format!("\nCLUSTER BY ({})", quote_identifiers(columns)));
    }

    if let Some(comment) = &table.comment {
        sql.push_str(&format!("\nCOMMENT = {}", string_literal(comment)));
    }

    sql.push(';');
    sql
}

/// 生成列定义
pub fn generate_column_sql(model: &SchemaModel, target: TargetDialect, column: &Column) -> String {
    let target_type = map_type(model.source_dialect, target, &column.source_type).target_type;
    let mut sql = format!("{} {}", quote_identifier(&column.name), target_type);

    if !column.nullable {
        sql.push_str(" NOT NULL");
    }

    if column.auto_increment {
        sql.push_str(" AUTOINCREMENT");
    } else if let Some(default) = column
        .default_value
        .as_deref()
        .and_then(|raw| column_default(model, raw, &target_type))
    {
        sql.push_str(&format!(" DEFAULT {default}"));
    }

    if let Some(comment) = &column.comment {
        sql.push_str(&format!(" COMMENT {}", string_literal(comment)));
    }

    sql
}

fn column_default(model: &SchemaModel, raw: &str, target_type: &str) -> Option<String> {
    if model.mode == ExtractionMode::Live && model.source_dialect.family() == DialectFamily::Mysql {
        translate_catalog_default(raw, target_type)
    } else {
        translate_default(raw, target_type)
    }
}

/// 聚簇键：主键列，其次第一个唯一索引的列
fn clustering_columns(table: &Table) -> Option<&[String]> {
    table
        .primary_key()
        .or_else(|| table.secondary_indexes().find(|index| index.unique))
        .map(|index| index.columns.as_slice())
}
