//! 分析流程编排
//!
//! 一次分析就是一个 [`AnalysisRun`]：抽取 -> 规范化 -> 风险检测 -> DDL 生成。
//! 任何阶段出错都让 run 进入 `failed`，不重试；重试即新建一个 run。

use crate::adapter::dump::parse_dump;
use crate::adapter::live::{self, ConnectionDescriptor};
use crate::adapter::{AnalysisSource, DumpSource, Extraction, extract_schema};
use crate::config::EngineConfig;
use crate::ddl;
use crate::dialect::{SourceDialect, TargetDialect};
use crate::error::{AnalyzerError, Result};
use crate::model::{SchemaModel, Table, build_model};
use crate::risk::{Risk, RuleContext, RuleSet, SeveritySummary, detect};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// 运行状态：pending -> running -> completed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 失败分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Connection,
    Parse,
    Validation,
    Unsupported,
}

impl From<&AnalyzerError> for FailureKind {
    fn from(err: &AnalyzerError) -> Self {
        match err {
            AnalyzerError::Connection(_) | AnalyzerError::Io(_) => FailureKind::Connection,
            AnalyzerError::Parse(_) | AnalyzerError::Serde(_) => FailureKind::Parse,
            AnalyzerError::Unsupported(_) => FailureKind::Unsupported,
            AnalyzerError::Validation(_)
            | AnalyzerError::InvalidTransition(_)
            | AnalyzerError::Config(_) => FailureKind::Validation,
        }
    }
}

/// 对外输出的分析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_type: Option<SourceDialect>,
    /// 基表数量
    pub tables_count: usize,
    /// 基表行数估计之和
    pub total_rows: u64,
    pub tables: Vec<Table>,
    pub risks: Vec<Risk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snowflake_ddl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            database: None,
            db_type: None,
            tables_count: 0,
            total_rows: 0,
            tables: Vec::new(),
            risks: Vec::new(),
            snowflake_ddl: None,
            error: Some(message.into()),
        }
    }

    pub fn severity_summary(&self) -> SeveritySummary {
        SeveritySummary::from_risks(&self.risks)
    }
}

/// 一次分析运行的记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub id: Uuid,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
    /// 校验失败意味着适配器缺陷，需要人工介入
    pub needs_operator_attention: bool,
}

impl Default for AnalysisRun {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: RunStatus::Pending,
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            failure_kind: None,
            needs_operator_attention: false,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(RunStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn complete(&mut self, result: AnalysisResult) -> Result<()> {
        self.transition(RunStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        self.result = Some(result);
        Ok(())
    }

    pub fn fail(&mut self, err: &AnalyzerError) -> Result<()> {
        self.transition(RunStatus::Failed)?;
        let kind = FailureKind::from(err);
        self.completed_at = Some(Utc::now());
        self.error = Some(err.to_string());
        self.failure_kind = Some(kind);
        self.needs_operator_attention = kind == FailureKind::Validation;
        Ok(())
    }

    fn transition(&mut self, to: RunStatus) -> Result<()> {
        let allowed = matches!(
            (self.status, to),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Completed)
                | (RunStatus::Running, RunStatus::Failed)
        );
        if !allowed {
            return Err(AnalyzerError::InvalidTransition(format!(
                "run {} cannot move from {} to {}",
                self.id, self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }

    /// 调用方看到的结果：失败时只有 `{success: false, error}`
    pub fn outcome(&self) -> AnalysisResult {
        match (&self.result, &self.error) {
            (Some(result), _) => result.clone(),
            (None, Some(message)) => AnalysisResult::failure(message.clone()),
            (None, None) => AnalysisResult::failure(format!("analysis run is {}", self.status)),
        }
    }
}

/// 连接测试结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProbe {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// 分析引擎
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: EngineConfig,
    rules: RuleSet,
    target: TargetDialect,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Analyzer {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            rules: RuleSet::standard(),
            target: TargetDialect::default(),
        }
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 执行一次完整分析；错误不会向外抛出，而是记录在返回的 run 上
    pub async fn analyze(&self, source: &AnalysisSource, cancel: &CancellationToken) -> AnalysisRun {
        let mut run = AnalysisRun::new();
        if let Err(e) = run.start() {
            error!("无法启动分析 {}: {}", run.id, e);
            return run;
        }
        info!("开始分析 {} ({})", run.id, describe_source(source));

        let outcome = extract_schema(source, &self.config, cancel)
            .await
            .and_then(|extraction| self.process(extraction));
        self.finish(run, outcome)
    }

    /// 同步分析上传的 dump，不涉及网络
    pub fn analyze_dump(&self, dump: &DumpSource) -> AnalysisRun {
        let mut run = AnalysisRun::new();
        if let Err(e) = run.start() {
            error!("无法启动分析 {}: {}", run.id, e);
            return run;
        }
        info!("开始分析 {} (dump)", run.id);

        let outcome = parse_dump(dump, &self.config.dump).and_then(|e| self.process(e));
        self.finish(run, outcome)
    }

    /// 对已规范化的模型做风险检测并生成 DDL
    pub fn analyze_model(&self, model: &SchemaModel) -> AnalysisResult {
        let context = RuleContext::new(self.target, &self.config.analysis);
        let risks = detect(model, &self.rules, &context);
        let ddl = ddl::generate(model, self.target);

        AnalysisResult {
            success: true,
            database: Some(model.database.clone()),
            db_type: Some(model.source_dialect),
            tables_count: model.base_table_count(),
            total_rows: model.total_rows(),
            tables: model.tables.clone(),
            risks,
            snowflake_ddl: Some(ddl),
            error: None,
        }
    }

    /// 测试连接，返回服务器版本与当前数据库
    pub async fn probe_connection(
        &self,
        descriptor: &ConnectionDescriptor,
        cancel: &CancellationToken,
    ) -> ConnectionProbe {
        match live::probe_connection(descriptor, &self.config, cancel).await {
            Ok(server) => {
                info!("连接测试成功: {}", descriptor.endpoint());
                ConnectionProbe {
                    success: true,
                    message: "Connection successful".to_string(),
                    server_version: Some(server.server_version),
                    database: Some(server.database),
                }
            }
            Err(e) => {
                warn!("连接测试失败 {}: {}", descriptor.endpoint(), e);
                ConnectionProbe {
                    success: false,
                    message: e.to_string(),
                    server_version: None,
                    database: None,
                }
            }
        }
    }

    fn process(&self, extraction: Extraction) -> Result<AnalysisResult> {
        let model = build_model(extraction)?;
        Ok(self.analyze_model(&model))
    }

    fn finish(&self, mut run: AnalysisRun, outcome: Result<AnalysisResult>) -> AnalysisRun {
        let transition = match outcome {
            Ok(result) => {
                let summary = result.severity_summary();
                info!(
                    "分析 {} 完成: {} 个表, {} 个错误, {} 个警告, {} 条提示",
                    run.id, result.tables_count, summary.errors, summary.warnings, summary.info
                );
                run.complete(result)
            }
            Err(err) => {
                if FailureKind::from(&err) == FailureKind::Validation {
                    error!("分析 {} 校验失败，需要人工介入: {}", run.id, err);
                } else {
                    warn!("分析 {} 失败: {}", run.id, err);
                }
                run.fail(&err)
            }
        };

        if let Err(e) = transition {
            error!("分析 {} 状态更新失败: {}", run.id, e);
        }
        run
    }
}

fn describe_source(source: &AnalysisSource) -> String {
    match source {
        AnalysisSource::Live { descriptor, .. } => format!("live {}", descriptor.endpoint()),
        AnalysisSource::Dump(dump) => match &dump.file_name {
            Some(name) => format!("dump {name}"),
            None => "dump".to_string(),
        },
    }
}
