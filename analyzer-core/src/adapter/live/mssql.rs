use super::{CatalogReader, ConnectionDescriptor, ServerInfo, TableAssembler, schema_object};
use crate::adapter::{RawColumn, RawTable};
use crate::config::LiveConfig;
use crate::dialect::DbType;
use crate::error::{AnalyzerError, Result};
use crate::model::{SchemaObject, TableKind};
use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

mod queries {
    pub const SERVER_INFO: &str = "SELECT @@VERSION AS server_version, DB_NAME() AS database_name";

    // 行数估计取堆或聚集索引（index_id < 2）的分区行数
    pub const LIST_TABLES: &str = r#"
        SELECT
            t.name AS table_name,
            'BASE TABLE' AS table_type,
            CAST(COALESCE((
                SELECT SUM(p.rows) FROM sys.partitions p
                WHERE p.object_id = t.object_id AND p.index_id < 2
            ), 0) AS BIGINT) AS row_estimate
        FROM sys.tables t
        JOIN sys.schemas s ON s.schema_id = t.schema_id
        WHERE s.name = @P1 AND t.is_ms_shipped = 0
        UNION ALL
        SELECT v.name, 'VIEW', CAST(0 AS BIGINT)
        FROM sys.views v
        JOIN sys.schemas s ON s.schema_id = v.schema_id
        WHERE s.name = @P1 AND v.is_ms_shipped = 0
        ORDER BY table_name
        "#;

    pub const LIST_COLUMNS: &str = r#"
        SELECT
            c.TABLE_NAME AS table_name,
            c.COLUMN_NAME AS column_name,
            c.DATA_TYPE AS data_type,
            CAST(c.CHARACTER_MAXIMUM_LENGTH AS INT) AS char_length,
            CAST(c.NUMERIC_PRECISION AS INT) AS numeric_precision,
            CAST(c.NUMERIC_SCALE AS INT) AS numeric_scale,
            CAST(c.DATETIME_PRECISION AS INT) AS datetime_precision,
            c.IS_NULLABLE AS is_nullable,
            c.COLUMN_DEFAULT AS column_default,
            CAST(COLUMNPROPERTY(
                OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME)),
                c.COLUMN_NAME,
                'IsIdentity'
            ) AS INT) AS is_identity,
            c.COLLATION_NAME AS collation_name
        FROM INFORMATION_SCHEMA.COLUMNS c
        WHERE c.TABLE_SCHEMA = @P1
        ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION
        "#;

    pub const LIST_INDEXES: &str = r#"
        SELECT
            t.name AS table_name,
            i.name AS index_name,
            i.is_unique,
            i.is_primary_key,
            c.name AS column_name
        FROM sys.indexes i
        JOIN sys.tables t ON t.object_id = i.object_id
        JOIN sys.schemas s ON s.schema_id = t.schema_id
        JOIN sys.index_columns ic
            ON ic.object_id = i.object_id AND ic.index_id = i.index_id
        JOIN sys.columns c
            ON c.object_id = ic.object_id AND c.column_id = ic.column_id
        WHERE s.name = @P1
        AND i.type > 0
        AND i.is_hypothetical = 0
        AND ic.is_included_column = 0
        ORDER BY t.name, i.name, ic.key_ordinal
        "#;

    pub const LIST_OBJECTS: &str = r#"
        SELECT
            CASE o.type WHEN 'P' THEN 'procedure' WHEN 'TR' THEN 'trigger' ELSE 'function' END AS kind,
            o.name AS name,
            OBJECT_NAME(NULLIF(o.parent_object_id, 0)) AS table_name
        FROM sys.objects o
        JOIN sys.schemas s ON s.schema_id = o.schema_id
        WHERE s.name = @P1
        AND o.type IN ('P', 'FN', 'IF', 'TF', 'TR')
        AND o.is_ms_shipped = 0
        UNION ALL
        SELECT 'sequence', sq.name, NULL
        FROM sys.sequences sq
        JOIN sys.schemas s ON s.schema_id = sq.schema_id
        WHERE s.name = @P1
        UNION ALL
        SELECT 'type', ty.name, NULL
        FROM sys.types ty
        JOIN sys.schemas s ON s.schema_id = ty.schema_id
        WHERE s.name = @P1 AND ty.is_user_defined = 1
        ORDER BY kind, name
        "#;
}

/// 括号内带长度的类型
const SIZED_TYPES: &[&str] = &["char", "varchar", "nchar", "nvarchar", "binary", "varbinary"];

/// 括号内带小数秒精度的类型
const FRACTIONAL_TYPES: &[&str] = &["datetime2", "datetimeoffset", "time"];

/// MSSQL 目录读取
pub(super) struct MssqlReader {
    client: Client<Compat<TcpStream>>,
    schema: String,
}

impl MssqlReader {
    pub(super) async fn connect(descriptor: &ConnectionDescriptor, live: &LiveConfig) -> Result<Self> {
        let mut config = Config::new();
        config.host(&descriptor.host);
        config.port(descriptor.port);
        config.database(&descriptor.database);
        config.authentication(AuthMethod::sql_server(
            &descriptor.username,
            &descriptor.password,
        ));
        if descriptor.ssl_enabled {
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::Off);
            config.trust_cert();
        }

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| AnalyzerError::connection(format!("MSSQL connection failed: {e}")))?;
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| AnalyzerError::connection(format!("MSSQL connection failed: {e}")))?;

        Ok(Self {
            client,
            schema: descriptor
                .schema_name
                .clone()
                .unwrap_or_else(|| live.mssql_schema.clone()),
        })
    }

    async fn fetch(&mut self, sql: &str) -> Result<Vec<Row>> {
        let stream = self.client.query(sql, &[&self.schema.as_str()]).await?;
        Ok(stream.into_first_result().await?)
    }
}

#[async_trait]
impl CatalogReader for MssqlReader {
    async fn server_info(&mut self) -> Result<ServerInfo> {
        let rows = self
            .client
            .simple_query(queries::SERVER_INFO)
            .await?
            .into_first_result()
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| AnalyzerError::parse("server info query returned no rows"))?;

        // @@VERSION 多行，只取第一行
        let version = get_string(row, "server_version")?;
        Ok(ServerInfo {
            server_version: version.lines().next().unwrap_or_default().trim().to_string(),
            database: get_string(row, "database_name")?,
            db_type: DbType::Mssql,
        })
    }

    async fn tables(&mut self) -> Result<Vec<RawTable>> {
        let rows = self.fetch(queries::LIST_TABLES).await?;
        let mut tables = Vec::with_capacity(rows.len());
        for row in &rows {
            let kind = if get_string(row, "table_type")? == "VIEW" {
                TableKind::View
            } else {
                TableKind::BaseTable
            };
            let mut table = RawTable::new(get_string(row, "table_name")?, kind);
            let estimate: Option<i64> = row.try_get("row_estimate")?;
            table.row_count = estimate.and_then(|v| u64::try_from(v).ok()).unwrap_or(0);
            tables.push(table);
        }
        debug!("schema {} 中有 {} 个表/视图", self.schema, tables.len());

        let mut assembler = TableAssembler::new(tables);

        for row in &self.fetch(queries::LIST_COLUMNS).await? {
            let table = get_string(row, "table_name")?;
            assembler.push_column(&table, column_from_row(row)?);
        }

        for row in &self.fetch(queries::LIST_INDEXES).await? {
            let table = get_string(row, "table_name")?;
            let index_name = get_string(row, "index_name")?;
            let unique: Option<bool> = row.try_get("is_unique")?;
            let primary: Option<bool> = row.try_get("is_primary_key")?;
            let column: Option<&str> = row.try_get("column_name")?;
            assembler.push_index_column(
                &table,
                &index_name,
                unique.unwrap_or(false),
                primary.unwrap_or(false),
                column.map(str::to_string),
            );
        }

        Ok(assembler.finish())
    }

    async fn objects(&mut self) -> Result<Vec<SchemaObject>> {
        let rows = self.fetch(queries::LIST_OBJECTS).await?;
        let mut objects = Vec::with_capacity(rows.len());
        for row in &rows {
            let table: Option<&str> = row.try_get("table_name")?;
            objects.extend(schema_object(
                &get_string(row, "kind")?,
                get_string(row, "name")?,
                table.map(str::to_string),
            ));
        }
        Ok(objects)
    }
}

fn column_from_row(row: &Row) -> Result<RawColumn> {
    let data_type = render_type(
        &get_string(row, "data_type")?,
        row.try_get("char_length")?,
        row.try_get("numeric_precision")?,
        row.try_get("numeric_scale")?,
        row.try_get("datetime_precision")?,
    );
    let is_identity: Option<i32> = row.try_get("is_identity")?;
    let default_value: Option<&str> = row.try_get("column_default")?;
    let collation: Option<&str> = row.try_get("collation_name")?;

    Ok(RawColumn {
        name: get_string(row, "column_name")?,
        data_type,
        nullable: get_string(row, "is_nullable")? == "YES",
        default_value: default_value.map(str::to_string),
        auto_increment: is_identity == Some(1),
        comment: None,
        collation: collation.map(str::to_string),
    })
}

/// 由 INFORMATION_SCHEMA 的拆分字段拼回类型文本，如 `nvarchar(max)`、`decimal(18,2)`
fn render_type(
    data_type: &str,
    char_length: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
    datetime_precision: Option<i32>,
) -> String {
    let name = data_type.to_lowercase();

    if SIZED_TYPES.contains(&name.as_str()) {
        return match char_length {
            Some(-1) => format!("{name}(max)"),
            Some(length) => format!("{name}({length})"),
            None => name,
        };
    }

    match (name.as_str(), precision, scale) {
        ("decimal" | "numeric", Some(p), Some(s)) => return format!("{name}({p},{s})"),
        ("decimal" | "numeric", Some(p), None) => return format!("{name}({p})"),
        _ => {}
    }

    if FRACTIONAL_TYPES.contains(&name.as_str()) {
        if let Some(fraction) = datetime_precision {
            return format!("{name}({fraction})");
        }
    }

    name
}

fn get_string(row: &Row, column: &str) -> Result<String> {
    let value: Option<&str> = row.try_get(column)?;
    Ok(value.unwrap_or_default().to_string())
}
