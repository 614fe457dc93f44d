use super::{Column, Index, SchemaModel, SourceType, Table, TableKind};
use crate::adapter::{Extraction, RawColumn, RawIndex, RawTable};
use crate::dialect::SourceDialect;
use crate::error::{AnalyzerError, Result};
use std::collections::HashSet;
use tracing::debug;

/// 将适配器产出的原始结构规范化为 [`SchemaModel`]
///
/// 检查唯一性约束（表名、列名、索引名）、索引列引用、主键数量，
/// 推导 `has_primary_key` 并按表名排序。任何违反都是适配器缺陷，
/// 返回 [`AnalyzerError::Validation`]。
pub fn build_model(extraction: Extraction) -> Result<SchemaModel> {
    let dialect = extraction.dialect;
    let mut seen_tables = HashSet::new();
    let mut tables = Vec::with_capacity(extraction.tables.len());

    for raw in extraction.tables {
        let key = name_key(&raw.name, dialect.table_names_case_sensitive());
        if !seen_tables.insert(key) {
            return Err(AnalyzerError::validation(format!(
                "duplicate table name '{}'",
                raw.name
            )));
        }
        tables.push(build_table(raw, dialect)?);
    }

    tables.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(
        "规范化完成: {} 个表, {} 个对象, 跳过 {} 条语句",
        tables.len(),
        extraction.objects.len(),
        extraction.skipped_statements
    );

    Ok(SchemaModel {
        database: extraction.database,
        source_dialect: dialect,
        mode: extraction.mode,
        tables,
        objects: extraction.objects,
        skipped_statements: extraction.skipped_statements,
    })
}

fn build_table(raw: RawTable, dialect: SourceDialect) -> Result<Table> {
    if raw.kind == TableKind::BaseTable && raw.columns.is_empty() {
        return Err(AnalyzerError::parse(format!(
            "table '{}' has no columns",
            raw.name
        )));
    }

    let case_sensitive = dialect.column_names_case_sensitive();

    let mut column_keys = HashSet::new();
    let mut columns = Vec::with_capacity(raw.columns.len());
    for column in raw.columns {
        if !column_keys.insert(name_key(&column.name, case_sensitive)) {
            return Err(AnalyzerError::validation(format!(
                "duplicate column '{}' in table '{}'",
                column.name, raw.name
            )));
        }
        columns.push(build_column(column));
    }

    let mut index_names = HashSet::new();
    let mut indexes = Vec::with_capacity(raw.indexes.len());
    for index in raw.indexes {
        validate_index(&index, &raw.name, &column_keys, case_sensitive)?;
        if !index_names.insert(name_key(&index.name, case_sensitive)) {
            return Err(AnalyzerError::validation(format!(
                "duplicate index '{}' in table '{}'",
                index.name, raw.name
            )));
        }
        indexes.push(Index {
            name: index.name,
            columns: index.columns,
            unique: index.unique || index.primary,
            is_primary_key: index.primary,
        });
    }

    let primary_keys = indexes.iter().filter(|i| i.is_primary_key).count();
    if primary_keys > 1 {
        return Err(AnalyzerError::validation(format!(
            "table '{}' has {} primary key indexes",
            raw.name, primary_keys
        )));
    }

    Ok(Table {
        name: raw.name,
        kind: raw.kind,
        row_count: match raw.kind {
            TableKind::BaseTable => raw.row_count,
            TableKind::View => 0,
        },
        columns,
        indexes,
        has_primary_key: primary_keys == 1,
        engine: raw.engine,
        comment: raw.comment,
        collation: raw.collation,
    })
}

fn build_column(raw: RawColumn) -> Column {
    Column {
        source_type: SourceType::parse(&raw.data_type),
        name: raw.name,
        nullable: raw.nullable,
        default_value: raw.default_value,
        auto_increment: raw.auto_increment,
        comment: raw.comment,
        collation: raw.collation,
    }
}

fn validate_index(
    index: &RawIndex,
    table: &str,
    column_keys: &HashSet<String>,
    case_sensitive: bool,
) -> Result<()> {
    if index.columns.is_empty() {
        return Err(AnalyzerError::validation(format!(
            "index '{}' on table '{}' has no columns",
            index.name, table
        )));
    }

    for column in &index.columns {
        if !column_keys.contains(&name_key(column, case_sensitive)) {
            return Err(AnalyzerError::validation(format!(
                "index '{}' on table '{}' references unknown column '{}'",
                index.name, table, column
            )));
        }
    }

    Ok(())
}

fn name_key(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_lowercase()
    }
}
