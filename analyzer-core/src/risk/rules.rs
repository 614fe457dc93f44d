//! 内置风险规则

use super::{ColumnSite, Risk, RiskType, RuleContext, Severity, TableSite};
use crate::dialect::{DialectFamily, SourceDialect};
use crate::mapping::{LossKind, MappingOutcome};
use crate::model::{ObjectKind, SchemaModel};

/// 依赖 PostgreSQL 扩展的列类型及其扩展名
const EXTENSION_TYPES: &[(&str, &str)] = &[
    ("geometry", "PostGIS"),
    ("geography", "PostGIS"),
    ("box2d", "PostGIS"),
    ("raster", "PostGIS"),
    ("hstore", "hstore"),
    ("citext", "citext"),
    ("ltree", "ltree"),
    ("vector", "pgvector"),
];

/// MySQL 排序规则名含该片段时视为非 UTF-8 编码
const LATIN_COLLATION_MARKER: &str = "latin";

fn extension_of(site: &ColumnSite<'_>) -> Option<&'static str> {
    if site.dialect.family() != DialectFamily::Postgres {
        return None;
    }
    EXTENSION_TYPES
        .iter()
        .find(|(name, _)| *name == site.column.source_type.name)
        .map(|(_, extension)| *extension)
}

pub fn size_limit_exceeded(context: &RuleContext, site: &ColumnSite<'_>) -> Option<Risk> {
    let MappingOutcome::Lossy(LossKind::Truncated { declared, max }) = site.mapping.outcome else {
        return None;
    };
    Some(Risk::column(
        &site.table.name,
        &site.column.name,
        RiskType::SizeLimitExceeded,
        Severity::Error,
        format!(
            "Column '{}' ({}) holds up to {} but {} {} is limited to {}; values will be truncated",
            site.column.name,
            site.column.source_type.raw,
            group_thousands(declared),
            context.target.display_name(),
            site.mapping.target_type,
            group_thousands(max)
        ),
    ))
}

pub fn precision_loss(context: &RuleContext, site: &ColumnSite<'_>) -> Option<Risk> {
    let MappingOutcome::Lossy(LossKind::Precision { precision, .. }) = site.mapping.outcome else {
        return None;
    };
    let message = match precision {
        Some(_) => format!(
            "Column '{}' ({}) exceeds {} NUMBER limits and becomes {}",
            site.column.name,
            site.column.source_type.raw,
            context.target.display_name(),
            site.mapping.target_type
        ),
        None => format!(
            "Column '{}' ({}) has no declared precision and becomes {}; fractional digits may be lost",
            site.column.name, site.column.source_type.raw, site.mapping.target_type
        ),
    };
    Some(Risk::column(
        &site.table.name,
        &site.column.name,
        RiskType::PrecisionLoss,
        Severity::Warning,
        message,
    ))
}

pub fn extension_dependency(context: &RuleContext, site: &ColumnSite<'_>) -> Option<Risk> {
    let extension = extension_of(site)?;
    Some(Risk::column(
        &site.table.name,
        &site.column.name,
        RiskType::UnsupportedFeature,
        Severity::Warning,
        format!(
            "Column '{}' uses type '{}' from the {} extension, which {} does not provide",
            site.column.name,
            site.column.source_type.name,
            extension,
            context.target.display_name()
        ),
    ))
}

/// 语义有损的转换；扩展类型已由 [`extension_dependency`] 报告
pub fn risky_type(context: &RuleContext, site: &ColumnSite<'_>) -> Option<Risk> {
    if site.mapping.outcome != MappingOutcome::Lossy(LossKind::Semantic) {
        return None;
    }
    if extension_of(site).is_some() {
        return None;
    }
    Some(Risk::column(
        &site.table.name,
        &site.column.name,
        RiskType::RiskyType,
        Severity::Warning,
        format!(
            "Type '{}' requires special handling for {} migration (mapped to {})",
            site.column.source_type.raw,
            context.target.display_name(),
            site.mapping.target_type
        ),
    ))
}

pub fn type_fallback(_context: &RuleContext, site: &ColumnSite<'_>) -> Option<Risk> {
    if !site.mapping.is_fallback() {
        return None;
    }
    Some(Risk::column(
        &site.table.name,
        &site.column.name,
        RiskType::TypeFallback,
        Severity::Info,
        format!(
            "Type '{}' has no explicit mapping; defaulting to {}",
            site.column.source_type.raw, site.mapping.target_type
        ),
    ))
}

pub fn column_encoding(_context: &RuleContext, site: &ColumnSite<'_>) -> Option<Risk> {
    let collation = site.column.collation.as_deref()?;
    if !is_latin(site.dialect, collation) {
        return None;
    }
    Some(Risk::column(
        &site.table.name,
        &site.column.name,
        RiskType::Encoding,
        Severity::Warning,
        format!("Non-UTF8 collation '{collation}' detected"),
    ))
}

pub fn missing_primary_key(_context: &RuleContext, site: &TableSite<'_>) -> Option<Risk> {
    let table = site.table;
    if table.has_primary_key {
        return None;
    }
    Some(Risk::table(
        &table.name,
        RiskType::MissingPrimaryKey,
        Severity::Warning,
        format!(
            "Table '{}' has no primary key - required for incremental sync",
            table.name
        ),
    ))
}

pub fn table_encoding(_context: &RuleContext, site: &TableSite<'_>) -> Option<Risk> {
    let table = site.table;
    let collation = table.collation.as_deref()?;
    if !is_latin(site.dialect, collation) {
        return None;
    }
    Some(Risk::table(
        &table.name,
        RiskType::Encoding,
        Severity::Warning,
        format!(
            "Table '{}' uses non-UTF8 default collation '{collation}'",
            table.name
        ),
    ))
}

pub fn large_table(context: &RuleContext, site: &TableSite<'_>) -> Option<Risk> {
    let table = site.table;
    if table.row_count <= context.large_table_rows {
        return None;
    }
    Some(Risk::table(
        &table.name,
        RiskType::LargeTable,
        Severity::Info,
        format!(
            "Table '{}' has {} rows - consider chunked migration",
            table.name,
            group_thousands(table.row_count)
        ),
    ))
}

pub fn partial_extraction(_context: &RuleContext, model: &SchemaModel) -> Vec<Risk> {
    if model.skipped_statements == 0 {
        return Vec::new();
    }
    let noun = if model.skipped_statements == 1 {
        "statement"
    } else {
        "statements"
    };
    vec![Risk::table(
        &model.database,
        RiskType::PartialExtraction,
        Severity::Info,
        format!(
            "{} {noun} skipped while parsing the dump; the schema may be incomplete",
            model.skipped_statements
        ),
    )]
}

/// 存储过程、触发器等无法自动迁移的对象
pub fn unsupported_objects(context: &RuleContext, model: &SchemaModel) -> Vec<Risk> {
    model
        .objects
        .iter()
        .map(|object| {
            let severity = match object.kind {
                ObjectKind::Procedure
                | ObjectKind::Function
                | ObjectKind::Trigger
                | ObjectKind::Extension => Severity::Warning,
                ObjectKind::Type | ObjectKind::Domain | ObjectKind::Sequence => Severity::Info,
            };
            Risk::table(
                object.table.as_deref().unwrap_or(&model.database),
                RiskType::UnsupportedFeature,
                severity,
                format!(
                    "{} '{}' is not migrated to {} and must be recreated manually",
                    capitalize(object.kind.as_str()),
                    object.name,
                    context.target.display_name()
                ),
            )
        })
        .collect()
}

// MSSQL 的 SQL_Latin1_General 是默认排序规则，不在此列
fn is_latin(dialect: SourceDialect, collation: &str) -> bool {
    dialect.family() == DialectFamily::Mysql
        && collation.to_lowercase().contains(LATIN_COLLATION_MARKER)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 1234567 -> "1,234,567"
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
