//! 源库适配器
//!
//! 两种输入：在线连接（[`live`]）读取系统目录，静态 dump（[`dump`]）逐条解析 DDL。
//! 两者都产出 [`Extraction`]，由 [`crate::model::build_model`] 规范化。

pub mod dump;
pub mod live;

use crate::config::EngineConfig;
use crate::dialect::SourceDialect;
use crate::error::Result;
use crate::model::{ExtractionMode, SchemaObject, TableKind};
use live::ConnectionDescriptor;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// 分析输入
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AnalysisSource {
    /// 在线连接；`dialect` 用于区分 MariaDB / Aurora 等同族方言，为空时按 `db_type` 推断
    Live {
        descriptor: ConnectionDescriptor,
        #[serde(default)]
        dialect: Option<SourceDialect>,
    },
    /// 上传的 SQL dump 文本
    Dump(DumpSource),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpSource {
    pub sql: String,
    #[serde(default)]
    pub dialect: Option<SourceDialect>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl DumpSource {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            dialect: None,
            file_name: None,
        }
    }

    pub fn with_dialect(mut self, dialect: SourceDialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

/// 适配器产出的原始 schema，尚未校验
#[derive(Debug, Clone)]
pub struct Extraction {
    pub database: String,
    pub dialect: SourceDialect,
    pub mode: ExtractionMode,
    pub tables: Vec<RawTable>,
    pub objects: Vec<SchemaObject>,
    pub skipped_statements: usize,
}

#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: String,
    pub kind: TableKind,
    pub row_count: u64,
    pub columns: Vec<RawColumn>,
    pub indexes: Vec<RawIndex>,
    pub engine: Option<String>,
    pub comment: Option<String>,
    pub collation: Option<String>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            row_count: 0,
            columns: Vec::new(),
            indexes: Vec::new(),
            engine: None,
            comment: None,
            collation: None,
        }
    }

    pub fn has_primary_index(&self) -> bool {
        self.indexes.iter().any(|i| i.primary)
    }
}

#[derive(Debug, Clone)]
pub struct RawColumn {
    pub name: String,
    /// 源库给出的类型文本
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub auto_increment: bool,
    pub comment: Option<String>,
    pub collation: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RawIndex {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary: bool,
}

/// 按输入方式分派到对应适配器
pub async fn extract_schema(
    source: &AnalysisSource,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<Extraction> {
    match source {
        AnalysisSource::Dump(dump) => dump::parse_dump(dump, &config.dump),
        AnalysisSource::Live {
            descriptor,
            dialect,
        } => live::extract(descriptor, *dialect, config, cancel).await,
    }
}

/// serial 类型或 nextval() 默认值都意味着自增列
pub(crate) fn implies_auto_increment(data_type: &str, default_value: Option<&str>) -> bool {
    let data_type = data_type.trim().to_lowercase();
    matches!(
        data_type.as_str(),
        "serial" | "bigserial" | "smallserial" | "serial4" | "serial8" | "serial2"
    ) || default_value
        .map(|d| d.to_lowercase().contains("nextval("))
        .unwrap_or(false)
}
