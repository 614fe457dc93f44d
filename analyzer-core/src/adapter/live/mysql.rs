use super::{CatalogReader, ConnectionDescriptor, ServerInfo, TableAssembler, schema_object};
use crate::adapter::{RawColumn, RawTable};
use crate::dialect::DbType;
use crate::error::{AnalyzerError, Result};
use crate::model::{SchemaObject, TableKind};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow, MySqlSslMode};
use sqlx::{ConnectOptions, Row};
use tracing::debug;

// information_schema 的文本列在部分版本中以 VARBINARY 返回，统一 CAST 为 CHAR
mod queries {
    pub const SERVER_INFO: &str = r#"
        SELECT CAST(VERSION() AS CHAR) AS server_version,
               CAST(DATABASE() AS CHAR) AS database_name
        "#;

    pub const LIST_TABLES: &str = r#"
        SELECT
            CAST(TABLE_NAME AS CHAR) AS TABLE_NAME,
            CAST(TABLE_TYPE AS CHAR) AS TABLE_TYPE,
            CAST(ENGINE AS CHAR) AS ENGINE,
            CAST(TABLE_COLLATION AS CHAR) AS TABLE_COLLATION,
            CAST(COALESCE(TABLE_ROWS, 0) AS UNSIGNED) AS ROW_COUNT,
            CAST(TABLE_COMMENT AS CHAR) AS TABLE_COMMENT
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = DATABASE()
        AND TABLE_TYPE IN ('BASE TABLE', 'VIEW')
        ORDER BY TABLE_NAME
        "#;

    pub const LIST_COLUMNS: &str = r#"
        SELECT
            CAST(TABLE_NAME AS CHAR) AS TABLE_NAME,
            CAST(COLUMN_NAME AS CHAR) AS COLUMN_NAME,
            CAST(COLUMN_TYPE AS CHAR) AS COLUMN_TYPE,
            CAST(IS_NULLABLE AS CHAR) AS IS_NULLABLE,
            CAST(COLUMN_DEFAULT AS CHAR) AS COLUMN_DEFAULT,
            CAST(EXTRA AS CHAR) AS EXTRA,
            CAST(COLLATION_NAME AS CHAR) AS COLLATION_NAME,
            CAST(COLUMN_COMMENT AS CHAR) AS COLUMN_COMMENT
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = DATABASE()
        ORDER BY TABLE_NAME, ORDINAL_POSITION
        "#;

    // 函数索引（8.0.13+）的 COLUMN_NAME 为 NULL
    pub const LIST_INDEXES: &str = r#"
        SELECT
            CAST(TABLE_NAME AS CHAR) AS TABLE_NAME,
            CAST(INDEX_NAME AS CHAR) AS INDEX_NAME,
            CAST(NON_UNIQUE AS SIGNED) AS NON_UNIQUE,
            CAST(COLUMN_NAME AS CHAR) AS COLUMN_NAME
        FROM information_schema.STATISTICS
        WHERE TABLE_SCHEMA = DATABASE()
        ORDER BY TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX
        "#;

    pub const LIST_OBJECTS: &str = r#"
        SELECT
            CAST(LOWER(ROUTINE_TYPE) AS CHAR) AS KIND,
            CAST(ROUTINE_NAME AS CHAR) AS NAME,
            CAST(NULL AS CHAR) AS TABLE_NAME
        FROM information_schema.ROUTINES
        WHERE ROUTINE_SCHEMA = DATABASE()
        UNION ALL
        SELECT
            'trigger',
            CAST(TRIGGER_NAME AS CHAR),
            CAST(EVENT_OBJECT_TABLE AS CHAR)
        FROM information_schema.TRIGGERS
        WHERE TRIGGER_SCHEMA = DATABASE()
        ORDER BY KIND, NAME
        "#;
}

const PRIMARY_INDEX_NAME: &str = "PRIMARY";

/// MySQL / MariaDB / Aurora-MySQL 目录读取
pub(super) struct MySqlReader {
    conn: MySqlConnection,
    database: String,
}

impl MySqlReader {
    pub(super) async fn connect(descriptor: &ConnectionDescriptor) -> Result<Self> {
        let ssl_mode = if descriptor.ssl_enabled {
            MySqlSslMode::Required
        } else {
            MySqlSslMode::Preferred
        };
        let options = MySqlConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .database(&descriptor.database)
            .username(&descriptor.username)
            .password(&descriptor.password)
            .ssl_mode(ssl_mode);

        let conn = options
            .connect()
            .await
            .map_err(|e| AnalyzerError::connection(format!("MySQL connection failed: {e}")))?;

        Ok(Self {
            conn,
            database: descriptor.database.clone(),
        })
    }
}

#[async_trait]
impl CatalogReader for MySqlReader {
    async fn server_info(&mut self) -> Result<ServerInfo> {
        let row = sqlx::query(queries::SERVER_INFO)
            .fetch_one(&mut self.conn)
            .await?;
        Ok(ServerInfo {
            server_version: get_string(&row, "server_version"),
            database: get_optional_string(&row, "database_name")
                .unwrap_or_else(|| self.database.clone()),
            db_type: DbType::Mysql,
        })
    }

    async fn tables(&mut self) -> Result<Vec<RawTable>> {
        let rows = sqlx::query(queries::LIST_TABLES)
            .fetch_all(&mut self.conn)
            .await?;
        let tables = rows.iter().filter_map(table_from_row).collect::<Vec<_>>();
        debug!("数据库 {} 中有 {} 个表/视图", self.database, tables.len());

        let mut assembler = TableAssembler::new(tables);

        let rows = sqlx::query(queries::LIST_COLUMNS)
            .fetch_all(&mut self.conn)
            .await?;
        for row in &rows {
            let table = get_string(row, "TABLE_NAME");
            assembler.push_column(&table, column_from_row(row));
        }

        let rows = sqlx::query(queries::LIST_INDEXES)
            .fetch_all(&mut self.conn)
            .await?;
        for row in &rows {
            let table = get_string(row, "TABLE_NAME");
            let index_name = get_string(row, "INDEX_NAME");
            let non_unique: i64 = row.try_get("NON_UNIQUE")?;
            assembler.push_index_column(
                &table,
                &index_name,
                non_unique == 0,
                index_name == PRIMARY_INDEX_NAME,
                get_optional_string(row, "COLUMN_NAME"),
            );
        }

        Ok(assembler.finish())
    }

    async fn objects(&mut self) -> Result<Vec<SchemaObject>> {
        let rows = sqlx::query(queries::LIST_OBJECTS)
            .fetch_all(&mut self.conn)
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                schema_object(
                    &get_string(row, "KIND"),
                    get_string(row, "NAME"),
                    get_optional_string(row, "TABLE_NAME"),
                )
            })
            .collect())
    }
}

fn table_from_row(row: &MySqlRow) -> Option<RawTable> {
    let name = get_string(row, "TABLE_NAME");
    if name.is_empty() {
        return None;
    }

    let kind = if get_string(row, "TABLE_TYPE") == "VIEW" {
        TableKind::View
    } else {
        TableKind::BaseTable
    };
    let mut table = RawTable::new(name, kind);

    if kind == TableKind::BaseTable {
        table.row_count = try_get_u64(row, "ROW_COUNT").unwrap_or(0);
        table.engine = get_optional_string(row, "ENGINE").filter(|e| !e.is_empty());
        table.collation = get_optional_string(row, "TABLE_COLLATION").filter(|c| !c.is_empty());
    }
    table.comment = get_optional_string(row, "TABLE_COMMENT").filter(|c| !c.is_empty());
    Some(table)
}

fn column_from_row(row: &MySqlRow) -> RawColumn {
    let extra = get_string(row, "EXTRA");
    RawColumn {
        name: get_string(row, "COLUMN_NAME"),
        data_type: get_string(row, "COLUMN_TYPE"),
        nullable: get_string(row, "IS_NULLABLE") == "YES",
        default_value: get_optional_string(row, "COLUMN_DEFAULT"),
        auto_increment: extra.to_lowercase().contains("auto_increment"),
        comment: get_optional_string(row, "COLUMN_COMMENT").filter(|c| !c.is_empty()),
        collation: get_optional_string(row, "COLLATION_NAME"),
    }
}

/// MySQL 5.x 返回 BIGINT，8.x 返回 BIGINT UNSIGNED
fn try_get_u64(row: &MySqlRow, column: &str) -> Option<u64> {
    if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(column) {
        return Some(v);
    }
    row.try_get::<Option<i64>, _>(column)
        .ok()
        .flatten()
        .and_then(|v| u64::try_from(v).ok())
}

fn get_string(row: &MySqlRow, column: &str) -> String {
    get_optional_string(row, column).unwrap_or_default()
}

fn get_optional_string(row: &MySqlRow, column: &str) -> Option<String> {
    row.try_get::<Option<String>, _>(column)
        .ok()
        .flatten()
        .or_else(|| {
            row.try_get::<Option<Vec<u8>>, _>(column)
                .ok()
                .flatten()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
}
