use crate::constants::{analysis, config, live};
use crate::dialect::SourceDialect;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 分析引擎配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub dump: DumpConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 分析流程配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 在线抽取超时（秒）
    pub timeout_secs: u64,
    /// 超过该行数估计的表产生 large_table 风险
    pub large_table_rows: u64,
}

/// dump 解析配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DumpConfig {
    /// 无法识别方言时使用的方言；为空则自动识别
    pub default_dialect: Option<SourceDialect>,
    /// dump 中没有 USE / CREATE DATABASE 时的数据库名
    pub database_name: String,
}

/// 在线连接配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LiveConfig {
    pub postgres_schema: String,
    pub mssql_schema: String,
}

/// 日志配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeout_secs: analysis::DEFAULT_TIMEOUT_SECS,
            large_table_rows: analysis::DEFAULT_LARGE_TABLE_ROWS,
        }
    }
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            default_dialect: None,
            database_name: analysis::DUMP_DATABASE_NAME.to_string(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            postgres_schema: live::DEFAULT_POSTGRES_SCHEMA.to_string(),
            mssql_schema: live::DEFAULT_MSSQL_SCHEMA.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: config::DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            dump: DumpConfig::default(),
            live: LiveConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// 按优先级查找配置文件：analyzer.toml -> .analyzer.toml，都不存在时使用默认配置
    pub fn find_and_load_config() -> Result<Self> {
        for config_file in config::CONFIG_FILE_NAMES {
            if Path::new(config_file).exists() {
                tracing::info!("找到配置文件: {}", config_file);
                return Self::load_from_file(config_file);
            }
        }

        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(Self::default())
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_with_comments();
        fs::write(&path, content)?;
        Ok(())
    }

    /// 生成带注释的TOML配置
    fn to_toml_with_comments(&self) -> String {
        const TEMPLATE: &str = include_str!("../templates/analyzer.toml.template");

        let default_dialect = match self.dump.default_dialect {
            Some(dialect) => format!("default_dialect = \"{}\"", dialect.as_str()),
            None => "# default_dialect = \"mysql\"".to_string(),
        };
        let log_file = match &self.logging.file {
            Some(file) => format!("file = {}", toml::Value::String(file.clone())),
            None => "# file = \"analyzer.log\"".to_string(),
        };

        TEMPLATE
            .replace("{timeout_secs}", &self.analysis.timeout_secs.to_string())
            .replace("{large_table_rows}", &self.analysis.large_table_rows.to_string())
            .replace("{default_dialect}", &default_dialect)
            .replace(
                "{database_name}",
                &toml::Value::String(self.dump.database_name.clone()).to_string(),
            )
            .replace(
                "{postgres_schema}",
                &toml::Value::String(self.live.postgres_schema.clone()).to_string(),
            )
            .replace(
                "{mssql_schema}",
                &toml::Value::String(self.live.mssql_schema.clone()).to_string(),
            )
            .replace(
                "{log_level}",
                &toml::Value::String(self.logging.level.clone()).to_string(),
            )
            .replace("{log_file}", &log_file)
    }

    /// 在线抽取超时
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.analysis.timeout_secs)
    }
}
