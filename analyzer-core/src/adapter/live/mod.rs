//! 在线目录读取
//!
//! 每个方言族一个 [`CatalogReader`] 实现，连接后依次读取服务器信息、表结构
//! 与非表对象。整个抽取过程受超时与调用方取消令牌约束。

mod mssql;
mod mysql;
mod postgres;

use super::{Extraction, RawColumn, RawIndex, RawTable};
use crate::config::EngineConfig;
use crate::dialect::{DbType, SourceDialect};
use crate::error::{AnalyzerError, Result};
use crate::model::{ExtractionMode, ObjectKind, SchemaObject};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 在线连接描述
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub db_type: DbType,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub ssl_enabled: bool,
    /// 为空时 PostgreSQL 用 `public`，MSSQL 用 `dbo`
    #[serde(default)]
    pub schema_name: Option<String>,
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("db_type", &self.db_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"***")
            .field("ssl_enabled", &self.ssl_enabled)
            .field("schema_name", &self.schema_name)
            .finish()
    }
}

impl ConnectionDescriptor {
    /// 日志中使用的连接标识（不含凭据）
    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}/{}", self.db_type, self.host, self.port, self.database)
    }
}

/// 连通性探测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub server_version: String,
    pub database: String,
    pub db_type: DbType,
}

/// 源库系统目录读取接口
#[async_trait]
pub(crate) trait CatalogReader: Send {
    async fn server_info(&mut self) -> Result<ServerInfo>;

    /// 基表与视图，含列、索引与行数估计
    async fn tables(&mut self) -> Result<Vec<RawTable>>;

    /// 存储过程、函数、触发器、序列、自定义类型等
    async fn objects(&mut self) -> Result<Vec<SchemaObject>>;
}

type BoxedReader = Box<dyn CatalogReader>;

async fn connect(descriptor: &ConnectionDescriptor, config: &EngineConfig) -> Result<BoxedReader> {
    let reader: BoxedReader = match descriptor.db_type {
        DbType::Postgres => Box::new(postgres::PostgresReader::connect(descriptor, &config.live).await?),
        DbType::Mysql => Box::new(mysql::MySqlReader::connect(descriptor).await?),
        DbType::Mssql => Box::new(mssql::MssqlReader::connect(descriptor, &config.live).await?),
        DbType::Snowflake => {
            return Err(AnalyzerError::unsupported(
                "Snowflake connector not yet implemented",
            ));
        }
    };
    Ok(reader)
}

/// 在线抽取 schema
///
/// `dialect` 必须与 `db_type` 属于同一方言族，用于标记 MariaDB / Aurora 等变体。
pub async fn extract(
    descriptor: &ConnectionDescriptor,
    dialect: Option<SourceDialect>,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<Extraction> {
    let dialect = resolve_dialect(descriptor.db_type, dialect)?;
    info!("开始在线抽取: {} ({})", descriptor.endpoint(), dialect);

    let work = async {
        let mut reader = connect(descriptor, config).await?;
        let server = reader.server_info().await?;
        debug!("已连接: {} {}", server.db_type, server.server_version);

        let tables = reader.tables().await?;
        let objects = reader.objects().await?;
        info!(
            "在线抽取完成: {} 个表, {} 个对象",
            tables.len(),
            objects.len()
        );

        Ok(Extraction {
            database: server.database,
            dialect,
            mode: ExtractionMode::Live,
            tables,
            objects,
            skipped_statements: 0,
        })
    };

    run_bounded(work, config.timeout(), cancel).await
}

/// 连通性探测：返回服务器版本与当前数据库
pub async fn probe_connection(
    descriptor: &ConnectionDescriptor,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> Result<ServerInfo> {
    info!("探测连接: {}", descriptor.endpoint());
    let work = async {
        let mut reader = connect(descriptor, config).await?;
        reader.server_info().await
    };
    run_bounded(work, config.timeout(), cancel).await
}

fn resolve_dialect(db_type: DbType, requested: Option<SourceDialect>) -> Result<SourceDialect> {
    let Some(base) = db_type.source_dialect() else {
        return Err(AnalyzerError::unsupported(format!(
            "{db_type} is not supported as an analysis source"
        )));
    };

    match requested {
        None => Ok(base),
        Some(dialect) if dialect.family() == base.family() => Ok(dialect),
        Some(dialect) => Err(AnalyzerError::unsupported(format!(
            "dialect {dialect} does not match connection type {db_type}"
        ))),
    }
}

/// 超时与取消都转为连接错误；取消优先
async fn run_bounded<T>(
    work: impl Future<Output = Result<T>>,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("在线抽取被取消");
            Err(AnalyzerError::connection("extraction cancelled"))
        }
        result = tokio::time::timeout(timeout, work) => match result {
            Ok(result) => result,
            Err(_) => {
                warn!("在线抽取超时: {:?}", timeout);
                Err(AnalyzerError::connection(format!(
                    "source did not respond within {} seconds",
                    timeout.as_secs()
                )))
            }
        },
    }
}

/// 目录查询中对象类型标签到 [`ObjectKind`]
fn object_kind(tag: &str) -> Option<ObjectKind> {
    match tag.trim().to_lowercase().as_str() {
        "procedure" => Some(ObjectKind::Procedure),
        "function" => Some(ObjectKind::Function),
        "trigger" => Some(ObjectKind::Trigger),
        "type" => Some(ObjectKind::Type),
        "domain" => Some(ObjectKind::Domain),
        "sequence" => Some(ObjectKind::Sequence),
        "extension" => Some(ObjectKind::Extension),
        _ => None,
    }
}

fn schema_object(tag: &str, name: String, table: Option<String>) -> Option<SchemaObject> {
    let Some(kind) = object_kind(tag) else {
        warn!("未知的对象类型: {} ({})", tag, name);
        return None;
    };
    Some(SchemaObject { kind, name, table })
}

/// 把按表名排列的列/索引行归并到各自的表上
///
/// 目录查询一次返回整个 schema 的行，逐表查询在大库上太慢。
struct TableAssembler {
    tables: Vec<RawTable>,
    positions: HashMap<String, usize>,
    /// 含表达式列的索引，结束时丢弃
    expression_indexes: HashSet<(String, String)>,
}

impl TableAssembler {
    fn new(tables: Vec<RawTable>) -> Self {
        let positions = tables
            .iter()
            .enumerate()
            .map(|(idx, table)| (table.name.clone(), idx))
            .collect();
        Self {
            tables,
            positions,
            expression_indexes: HashSet::new(),
        }
    }

    fn table_mut(&mut self, name: &str) -> Option<&mut RawTable> {
        let idx = *self.positions.get(name)?;
        self.tables.get_mut(idx)
    }

    fn push_column(&mut self, table: &str, column: RawColumn) {
        match self.table_mut(table) {
            Some(target) => target.columns.push(column),
            None => debug!("忽略不在表清单中的列: {}.{}", table, column.name),
        }
    }

    fn push_index(&mut self, table: &str, index: RawIndex) {
        if let Some(target) = self.table_mut(table) {
            target.indexes.push(index);
        }
    }

    /// 逐列追加索引；`column` 为 None 表示表达式列
    fn push_index_column(
        &mut self,
        table: &str,
        index_name: &str,
        unique: bool,
        primary: bool,
        column: Option<String>,
    ) {
        let Some(column) = column else {
            self.expression_indexes
                .insert((table.to_string(), index_name.to_string()));
            return;
        };
        let Some(target) = self.table_mut(table) else {
            return;
        };

        match target.indexes.iter_mut().find(|i| i.name == index_name) {
            Some(index) => index.columns.push(column),
            None => target.indexes.push(RawIndex {
                name: index_name.to_string(),
                columns: vec![column],
                unique: unique || primary,
                primary,
            }),
        }
    }

    fn finish(mut self) -> Vec<RawTable> {
        for (table, index) in &self.expression_indexes {
            if let Some(&idx) = self.positions.get(table) {
                debug!("跳过表达式索引: {}.{}", table, index);
                self.tables[idx].indexes.retain(|i| &i.name != index);
            }
        }
        self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableKind;

    fn descriptor(db_type: DbType) -> ConnectionDescriptor {
        ConnectionDescriptor {
            db_type,
            host: "127.0.0.1".to_string(),
            port: 1,
            database: "shop".to_string(),
            username: "reader".to_string(),
            password: "s3cret".to_string(),
            ssl_enabled: false,
            schema_name: None,
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", descriptor(DbType::Mysql));
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("***"));
        assert!(rendered.contains("reader"));
    }

    #[test]
    fn test_descriptor_deserializes_with_defaults() {
        let json = r#"{"db_type":"postgres","host":"db","port":5432,"database":"app","username":"u","password":"p"}"#;
        let descriptor: ConnectionDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.db_type, DbType::Postgres);
        assert!(!descriptor.ssl_enabled);
        assert_eq!(descriptor.schema_name, None);
        assert_eq!(descriptor.endpoint(), "postgres://db:5432/app");
    }

    #[test]
    fn test_resolve_dialect() {
        assert_eq!(
            resolve_dialect(DbType::Mysql, None).unwrap(),
            SourceDialect::Mysql
        );
        assert_eq!(
            resolve_dialect(DbType::Mysql, Some(SourceDialect::Mariadb)).unwrap(),
            SourceDialect::Mariadb
        );
        assert_eq!(
            resolve_dialect(DbType::Postgres, Some(SourceDialect::AuroraPostgres)).unwrap(),
            SourceDialect::AuroraPostgres
        );
        assert!(matches!(
            resolve_dialect(DbType::Postgres, Some(SourceDialect::Mysql)),
            Err(AnalyzerError::Unsupported(_))
        ));
        assert!(matches!(
            resolve_dialect(DbType::Snowflake, None),
            Err(AnalyzerError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_extract_snowflake_is_unsupported() {
        let err = extract(
            &descriptor(DbType::Snowflake),
            None,
            &EngineConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_probe_snowflake_not_implemented() {
        let err = probe_connection(
            &descriptor(DbType::Snowflake),
            &EngineConfig::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("not yet implemented"));
    }

    #[tokio::test]
    async fn test_cancelled_extraction_fails_as_connection_error() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = extract(
            &descriptor(DbType::Postgres),
            None,
            &EngineConfig::default(),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::Connection(_)));
        assert!(err.to_string().contains("cancelled"));
    }

    #[tokio::test]
    async fn test_run_bounded_times_out() {
        let err = run_bounded(
            std::future::pending::<Result<()>>(),
            Duration::from_millis(20),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::Connection(_)));
    }

    #[test]
    fn test_assembler_groups_rows_and_drops_expression_indexes() {
        let mut assembler = TableAssembler::new(vec![
            RawTable::new("orders", TableKind::BaseTable),
            RawTable::new("users", TableKind::BaseTable),
        ]);

        for name in ["id", "email"] {
            assembler.push_column(
                "users",
                RawColumn {
                    name: name.to_string(),
                    data_type: "int".to_string(),
                    nullable: false,
                    default_value: None,
                    auto_increment: false,
                    comment: None,
                    collation: None,
                },
            );
        }
        assembler.push_index_column("users", "PRIMARY", true, true, Some("id".to_string()));
        assembler.push_index_column("users", "idx_mix", false, false, Some("email".to_string()));
        assembler.push_index_column("users", "idx_mix", false, false, Some("id".to_string()));
        assembler.push_index_column("users", "idx_expr", false, false, Some("email".to_string()));
        assembler.push_index_column("users", "idx_expr", false, false, None);
        assembler.push_index_column("ghost", "idx", false, false, Some("x".to_string()));

        let tables = assembler.finish();
        assert!(tables[0].columns.is_empty());
        let users = &tables[1];
        assert_eq!(users.columns.len(), 2);
        assert_eq!(users.indexes.len(), 2);
        assert!(users.indexes[0].primary && users.indexes[0].unique);
        assert_eq!(users.indexes[1].columns, vec!["email", "id"]);
    }

    #[test]
    fn test_object_kind_tags() {
        assert_eq!(object_kind("PROCEDURE"), Some(ObjectKind::Procedure));
        assert_eq!(object_kind("domain"), Some(ObjectKind::Domain));
        assert_eq!(object_kind("rule"), None);
    }
}
