use super::{CatalogReader, ConnectionDescriptor, ServerInfo, TableAssembler, schema_object};
use crate::adapter::{RawColumn, RawIndex, RawTable, implies_auto_increment};
use crate::config::LiveConfig;
use crate::dialect::DbType;
use crate::error::{AnalyzerError, Result};
use crate::model::{SchemaObject, TableKind};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, PgSslMode};
use sqlx::{ConnectOptions, Row};
use tracing::debug;

mod queries {
    pub const SERVER_INFO: &str = r#"
        SELECT version() AS server_version, current_database()::text AS database_name
        "#;

    pub const LIST_TABLES: &str = r#"
        SELECT
            c.relname::text AS table_name,
            CASE WHEN c.relkind IN ('v', 'm') THEN 'VIEW' ELSE 'BASE TABLE' END AS table_type,
            GREATEST(c.reltuples, 0)::bigint AS row_estimate,
            obj_description(c.oid, 'pg_class') AS table_comment
        FROM pg_class c
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE n.nspname = $1
        AND c.relkind IN ('r', 'p', 'v', 'm')
        AND NOT c.relispartition
        ORDER BY c.relname
        "#;

    pub const LIST_COLUMNS: &str = r#"
        SELECT
            c.relname::text AS table_name,
            a.attname::text AS column_name,
            format_type(a.atttypid, a.atttypmod) AS column_type,
            NOT a.attnotnull AS is_nullable,
            pg_get_expr(d.adbin, d.adrelid) AS column_default,
            a.attidentity <> '' AS is_identity,
            col_description(c.oid, a.attnum) AS column_comment,
            co.collname::text AS collation_name
        FROM pg_attribute a
        JOIN pg_class c ON c.oid = a.attrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
        LEFT JOIN pg_collation co
            ON co.oid = a.attcollation AND co.collname <> 'default'
        WHERE n.nspname = $1
        AND c.relkind IN ('r', 'p', 'v', 'm')
        AND a.attnum > 0
        AND NOT a.attisdropped
        ORDER BY c.relname, a.attnum
        "#;

    // 表达式索引（indexprs 非空）无法映射到列，直接排除
    pub const LIST_INDEXES: &str = r#"
        SELECT
            t.relname::text AS table_name,
            i.relname::text AS index_name,
            ix.indisunique AS is_unique,
            ix.indisprimary AS is_primary,
            array_agg(a.attname::text ORDER BY k.ord) AS column_names
        FROM pg_index ix
        JOIN pg_class t ON t.oid = ix.indrelid
        JOIN pg_class i ON i.oid = ix.indexrelid
        JOIN pg_namespace n ON n.oid = t.relnamespace
        CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
        JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
        WHERE n.nspname = $1
        AND ix.indexprs IS NULL
        AND k.ord <= ix.indnkeyatts
        GROUP BY t.relname, i.relname, ix.indisunique, ix.indisprimary
        ORDER BY t.relname, ix.indisprimary DESC, i.relname
        "#;

    // 扩展自带的函数与类型不算用户对象
    pub const LIST_OBJECTS: &str = r#"
        SELECT CASE p.prokind WHEN 'p' THEN 'procedure' ELSE 'function' END AS kind,
               p.proname::text AS name,
               NULL::text AS table_name
        FROM pg_proc p
        JOIN pg_namespace n ON n.oid = p.pronamespace
        WHERE n.nspname = $1
        AND p.prokind IN ('f', 'p')
        AND NOT EXISTS (
            SELECT 1 FROM pg_depend d WHERE d.objid = p.oid AND d.deptype = 'e'
        )
        UNION ALL
        SELECT 'trigger', tg.tgname::text, c.relname::text
        FROM pg_trigger tg
        JOIN pg_class c ON c.oid = tg.tgrelid
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE n.nspname = $1 AND NOT tg.tgisinternal
        UNION ALL
        SELECT 'sequence', c.relname::text, NULL
        FROM pg_class c
        JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE n.nspname = $1
        AND c.relkind = 'S'
        AND NOT EXISTS (
            SELECT 1 FROM pg_depend d
            WHERE d.objid = c.oid AND d.deptype = 'i'
        )
        UNION ALL
        SELECT CASE t.typtype WHEN 'd' THEN 'domain' ELSE 'type' END,
               t.typname::text,
               NULL
        FROM pg_type t
        JOIN pg_namespace n ON n.oid = t.typnamespace
        WHERE n.nspname = $1
        AND (
            t.typtype IN ('e', 'd', 'r')
            OR (t.typtype = 'c' AND EXISTS (
                SELECT 1 FROM pg_class c WHERE c.oid = t.typrelid AND c.relkind = 'c'
            ))
        )
        AND NOT EXISTS (
            SELECT 1 FROM pg_depend d WHERE d.objid = t.oid AND d.deptype = 'e'
        )
        UNION ALL
        SELECT 'extension', e.extname::text, NULL
        FROM pg_extension e
        WHERE e.extname <> 'plpgsql'
        ORDER BY 1, 2
        "#;
}

/// PostgreSQL / Aurora-PostgreSQL 目录读取
pub(super) struct PostgresReader {
    conn: PgConnection,
    schema: String,
}

impl PostgresReader {
    pub(super) async fn connect(
        descriptor: &ConnectionDescriptor,
        live: &LiveConfig,
    ) -> Result<Self> {
        let ssl_mode = if descriptor.ssl_enabled {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        let options = PgConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .database(&descriptor.database)
            .username(&descriptor.username)
            .password(&descriptor.password)
            .ssl_mode(ssl_mode);

        let conn = options.connect().await.map_err(|e| {
            AnalyzerError::connection(format!("PostgreSQL connection failed: {e}"))
        })?;

        Ok(Self {
            conn,
            schema: descriptor
                .schema_name
                .clone()
                .unwrap_or_else(|| live.postgres_schema.clone()),
        })
    }
}

#[async_trait]
impl CatalogReader for PostgresReader {
    async fn server_info(&mut self) -> Result<ServerInfo> {
        let row = sqlx::query(queries::SERVER_INFO)
            .fetch_one(&mut self.conn)
            .await?;
        Ok(ServerInfo {
            server_version: row.try_get("server_version")?,
            database: row.try_get("database_name")?,
            db_type: DbType::Postgres,
        })
    }

    async fn tables(&mut self) -> Result<Vec<RawTable>> {
        let rows = sqlx::query(queries::LIST_TABLES)
            .bind(&self.schema)
            .fetch_all(&mut self.conn)
            .await?;
        let tables = rows.iter().map(table_from_row).collect::<Result<Vec<_>>>()?;
        debug!("schema {} 中有 {} 个表/视图", self.schema, tables.len());

        let mut assembler = TableAssembler::new(tables);

        let rows = sqlx::query(queries::LIST_COLUMNS)
            .bind(&self.schema)
            .fetch_all(&mut self.conn)
            .await?;
        for row in &rows {
            let table: String = row.try_get("table_name")?;
            assembler.push_column(&table, column_from_row(row)?);
        }

        let rows = sqlx::query(queries::LIST_INDEXES)
            .bind(&self.schema)
            .fetch_all(&mut self.conn)
            .await?;
        for row in &rows {
            let table: String = row.try_get("table_name")?;
            let primary: bool = row.try_get("is_primary")?;
            assembler.push_index(
                &table,
                RawIndex {
                    name: row.try_get("index_name")?,
                    columns: row.try_get("column_names")?,
                    unique: row.try_get::<bool, _>("is_unique")? || primary,
                    primary,
                },
            );
        }

        Ok(assembler.finish())
    }

    async fn objects(&mut self) -> Result<Vec<SchemaObject>> {
        let rows = sqlx::query(queries::LIST_OBJECTS)
            .bind(&self.schema)
            .fetch_all(&mut self.conn)
            .await?;

        let mut objects = Vec::with_capacity(rows.len());
        for row in &rows {
            let kind: String = row.try_get("kind")?;
            let name: String = row.try_get("name")?;
            let table: Option<String> = row.try_get("table_name")?;
            objects.extend(schema_object(&kind, name, table));
        }
        Ok(objects)
    }
}

fn table_from_row(row: &PgRow) -> Result<RawTable> {
    let name: String = row.try_get("table_name")?;
    let table_type: String = row.try_get("table_type")?;
    let kind = if table_type == "VIEW" {
        TableKind::View
    } else {
        TableKind::BaseTable
    };

    let mut table = RawTable::new(name, kind);
    if kind == TableKind::BaseTable {
        let estimate: i64 = row.try_get("row_estimate")?;
        table.row_count = u64::try_from(estimate).unwrap_or(0);
    }
    table.comment = row
        .try_get::<Option<String>, _>("table_comment")?
        .filter(|c| !c.is_empty());
    Ok(table)
}

fn column_from_row(row: &PgRow) -> Result<RawColumn> {
    let data_type: String = row.try_get("column_type")?;
    let default_value: Option<String> = row.try_get("column_default")?;
    let is_identity: bool = row.try_get("is_identity")?;

    Ok(RawColumn {
        name: row.try_get("column_name")?,
        auto_increment: is_identity || implies_auto_increment(&data_type, default_value.as_deref()),
        data_type,
        nullable: row.try_get("is_nullable")?,
        default_value,
        comment: row
            .try_get::<Option<String>, _>("column_comment")?
            .filter(|c| !c.is_empty()),
        collation: row.try_get("collation_name")?,
    })
}
