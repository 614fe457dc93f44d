use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// 源库不可达、认证失败、超时或被取消
    #[error("{0}")]
    Connection(String),

    /// dump 文本或系统目录返回内容无法解析
    #[error("{0}")]
    Parse(String),

    /// 内部不变量被破坏（通常意味着适配器缺陷）
    #[error("{0}")]
    Validation(String),

    /// 不支持的源类型或功能
    #[error("{0}")]
    Unsupported(String),

    #[error("invalid run state transition: {0}")]
    InvalidTransition(String),

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

// sqlx 错误：网络/TLS/连接池类归为连接错误，其余（SQL执行、解码）归为目录读取错误
impl From<sqlx::Error> for AnalyzerError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => AnalyzerError::Connection(err.to_string()),
            other => AnalyzerError::Parse(format!("unreadable catalog response: {other}")),
        }
    }
}

impl From<tiberius::error::Error> for AnalyzerError {
    fn from(err: tiberius::error::Error) -> Self {
        match &err {
            tiberius::error::Error::Server(_) | tiberius::error::Error::Conversion(_) => {
                AnalyzerError::Parse(format!("unreadable catalog response: {err}"))
            }
            _ => AnalyzerError::Connection(err.to_string()),
        }
    }
}

impl AnalyzerError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}
