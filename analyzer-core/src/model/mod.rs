//! 规范化的 schema 模型
//!
//! 适配器产出的原始结构经 [`builder`] 校验、排序后得到 [`SchemaModel`]，
//! 之后的风险检测、DDL 生成都只读这个模型。

pub mod builder;
mod source_type;

pub use builder::build_model;
pub use source_type::SourceType;

use crate::dialect::SourceDialect;
use serde::{Deserialize, Serialize};

/// 抽取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    Live,
    Dump,
}

/// 一次分析得到的完整 schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaModel {
    pub database: String,
    pub source_dialect: SourceDialect,
    pub mode: ExtractionMode,
    /// 按表名排序
    pub tables: Vec<Table>,
    /// 存储过程、触发器、自定义类型等非表对象
    pub objects: Vec<SchemaObject>,
    /// dump 中无法解析而被跳过的语句数
    pub skipped_statements: usize,
}

impl SchemaModel {
    /// 基表（不含视图）
    pub fn base_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(|t| t.kind == TableKind::BaseTable)
    }

    pub fn base_table_count(&self) -> usize {
        self.base_tables().count()
    }

    /// 基表行数估计之和
    pub fn total_rows(&self) -> u64 {
        self.base_tables().map(|t| t.row_count).sum()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    BaseTable,
    View,
}

/// 表定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub kind: TableKind,
    pub row_count: u64,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub has_primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
}

impl Table {
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.is_primary_key)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// 非主键索引
    pub fn secondary_indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.iter().filter(|i| !i.is_primary_key)
    }
}

/// 列定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub source_type: SourceType,
    pub nullable: bool,
    /// 原样保留的默认值表达式
    pub default_value: Option<String>,
    #[serde(default)]
    pub auto_increment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
}

/// 索引定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub is_primary_key: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Procedure,
    Function,
    Trigger,
    Type,
    Domain,
    Sequence,
    Extension,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Procedure => "stored procedure",
            ObjectKind::Function => "function",
            ObjectKind::Trigger => "trigger",
            ObjectKind::Type => "custom type",
            ObjectKind::Domain => "domain",
            ObjectKind::Sequence => "sequence",
            ObjectKind::Extension => "extension",
        }
    }
}

/// 非表 schema 对象
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaObject {
    pub kind: ObjectKind,
    pub name: String,
    /// 触发器所属的表
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}
