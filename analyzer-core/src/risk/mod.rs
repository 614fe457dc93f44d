//! 迁移风险检测
//!
//! 规则是显式传入的纯函数列表，按作用域分为列规则、表规则和模型规则。
//! 只遍历基表；输出顺序：按模型中表的顺序，先逐列（每列按规则顺序）
//! 再表级规则，最后是模型级规则。同一输入总是得到同一结果。

pub mod rules;

use crate::config::AnalysisConfig;
use crate::dialect::{SourceDialect, TargetDialect};
use crate::mapping::{TypeMapping, map_type};
use crate::model::{Column, SchemaModel, Table};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 风险等级，比较顺序 info < warning < error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 风险分类标签，序列化值是对外稳定的
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskType {
    MissingPrimaryKey,
    SizeLimitExceeded,
    PrecisionLoss,
    UnsupportedFeature,
    TypeFallback,
    RiskyType,
    Encoding,
    LargeTable,
    PartialExtraction,
}

impl RiskType {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskType::MissingPrimaryKey => "missing_primary_key",
            RiskType::SizeLimitExceeded => "size_limit_exceeded",
            RiskType::PrecisionLoss => "precision_loss",
            RiskType::UnsupportedFeature => "unsupported_feature",
            RiskType::TypeFallback => "type_fallback",
            RiskType::RiskyType => "risky_type",
            RiskType::Encoding => "encoding",
            RiskType::LargeTable => "large_table",
            RiskType::PartialExtraction => "partial_extraction",
        }
    }
}

/// 一条迁移风险
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub table: String,
    pub column: Option<String>,
    #[serde(rename = "type")]
    pub risk_type: RiskType,
    pub severity: Severity,
    /// 仅用于展示
    pub message: String,
}

impl Risk {
    pub fn table(
        table: impl Into<String>,
        risk_type: RiskType,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: None,
            risk_type,
            severity,
            message: message.into(),
        }
    }

    pub fn column(
        table: impl Into<String>,
        column: impl Into<String>,
        risk_type: RiskType,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: Some(column.into()),
            risk_type,
            severity,
            message: message.into(),
        }
    }
}

/// 按等级汇总的风险数，按需计算，不落盘
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SeveritySummary {
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
}

impl SeveritySummary {
    pub fn from_risks(risks: &[Risk]) -> Self {
        risks
            .iter()
            .fold(Self::default(), |mut summary, risk| {
                match risk.severity {
                    Severity::Error => summary.errors += 1,
                    Severity::Warning => summary.warnings += 1,
                    Severity::Info => summary.info += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.errors + self.warnings + self.info
    }
}

/// 规则运行参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleContext {
    pub target: TargetDialect,
    /// 行数估计超过该值的表视为大表
    pub large_table_rows: u64,
}

impl RuleContext {
    pub fn new(target: TargetDialect, analysis: &AnalysisConfig) -> Self {
        Self {
            target,
            large_table_rows: analysis.large_table_rows,
        }
    }
}

impl Default for RuleContext {
    fn default() -> Self {
        Self::new(TargetDialect::default(), &AnalysisConfig::default())
    }
}

/// 列规则的输入：列、所在表及其类型映射结果
pub struct ColumnSite<'a> {
    pub dialect: SourceDialect,
    pub table: &'a Table,
    pub column: &'a Column,
    pub mapping: &'a TypeMapping,
}

/// 表规则的输入
pub struct TableSite<'a> {
    pub dialect: SourceDialect,
    pub table: &'a Table,
}

pub type ColumnRule = fn(&RuleContext, &ColumnSite<'_>) -> Option<Risk>;
pub type TableRule = fn(&RuleContext, &TableSite<'_>) -> Option<Risk>;
pub type ModelRule = fn(&RuleContext, &SchemaModel) -> Vec<Risk>;

/// 有序规则集
#[derive(Clone, Default)]
pub struct RuleSet {
    pub column_rules: Vec<ColumnRule>,
    pub table_rules: Vec<TableRule>,
    pub model_rules: Vec<ModelRule>,
}

impl RuleSet {
    /// 默认规则集
    pub fn standard() -> Self {
        Self {
            column_rules: vec![
                rules::size_limit_exceeded,
                rules::precision_loss,
                rules::extension_dependency,
                rules::risky_type,
                rules::type_fallback,
                rules::column_encoding,
            ],
            table_rules: vec![
                rules::missing_primary_key,
                rules::table_encoding,
                rules::large_table,
            ],
            model_rules: vec![rules::partial_extraction, rules::unsupported_objects],
        }
    }

    pub fn with_column_rule(mut self, rule: ColumnRule) -> Self {
        self.column_rules.push(rule);
        self
    }

    pub fn with_table_rule(mut self, rule: TableRule) -> Self {
        self.table_rules.push(rule);
        self
    }

    pub fn with_model_rule(mut self, rule: ModelRule) -> Self {
        self.model_rules.push(rule);
        self
    }
}

impl fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("column_rules", &self.column_rules.len())
            .field("table_rules", &self.table_rules.len())
            .field("model_rules", &self.model_rules.len())
            .finish()
    }
}

/// 对模型运行规则集
pub fn detect(model: &SchemaModel, rules: &RuleSet, context: &RuleContext) -> Vec<Risk> {
    let mut risks = Vec::new();

    for table in model.base_tables() {
        for column in &table.columns {
            let mapping = map_type(model.source_dialect, context.target, &column.source_type);
            let site = ColumnSite {
                dialect: model.source_dialect,
                table,
                column,
                mapping: &mapping,
            };
            risks.extend(rules.column_rules.iter().filter_map(|rule| rule(context, &site)));
        }
        let site = TableSite {
            dialect: model.source_dialect,
            table,
        };
        risks.extend(rules.table_rules.iter().filter_map(|rule| rule(context, &site)));
    }

    for rule in &rules.model_rules {
        risks.extend(rule(context, model));
    }

    risks
}
