use crate::config::LoggingConfig;
use crate::constants::config::LOG_FILE_ENV;
use crate::error::Result;

/// 为宿主进程（API 服务）设置日志记录系统
///
/// 库代码只使用 tracing 宏；订阅者由宿主在入口处安装。
/// RUST_LOG 优先于配置中的级别，ANALYZER_LOG_FILE 优先于配置中的文件。
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let log_file = std::env::var(LOG_FILE_ENV).ok().or_else(|| config.file.clone());

    if let Some(log_file) = log_file {
        // 输出到文件 - 使用详细格式便于排查
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;

        let _ = fmt()
            .with_env_filter(env_filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_line_number(true)
            .try_init();
    } else {
        // 输出到 stderr - 紧凑格式
        let _ = fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .compact()
            .try_init();
    }

    Ok(())
}

/// 最小化日志配置，已有全局订阅者时静默忽略
pub fn setup_minimal_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_test_writer()
        .compact()
        .try_init();
}
