//! 源/目标方言定义与 dump 方言识别

use serde::{Deserialize, Serialize};
use std::fmt;

/// 源库方言（封闭集合，按 tag 做穷尽匹配分派）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceDialect {
    Mssql,
    Mysql,
    Mariadb,
    Postgres,
    AuroraMysql,
    AuroraPostgres,
}

/// 方言族：同一族共用适配器与类型映射表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectFamily {
    Mssql,
    Mysql,
    Postgres,
}

impl SourceDialect {
    pub const ALL: [SourceDialect; 6] = [
        SourceDialect::Mssql,
        SourceDialect::Mysql,
        SourceDialect::Mariadb,
        SourceDialect::Postgres,
        SourceDialect::AuroraMysql,
        SourceDialect::AuroraPostgres,
    ];

    pub fn family(self) -> DialectFamily {
        match self {
            SourceDialect::Mssql => DialectFamily::Mssql,
            SourceDialect::Mysql | SourceDialect::Mariadb | SourceDialect::AuroraMysql => {
                DialectFamily::Mysql
            }
            SourceDialect::Postgres | SourceDialect::AuroraPostgres => DialectFamily::Postgres,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceDialect::Mssql => "mssql",
            SourceDialect::Mysql => "mysql",
            SourceDialect::Mariadb => "mariadb",
            SourceDialect::Postgres => "postgres",
            SourceDialect::AuroraMysql => "aurora_mysql",
            SourceDialect::AuroraPostgres => "aurora_postgres",
        }
    }

    /// 解析方言名称
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mssql" | "sqlserver" | "sql_server" => Some(Self::Mssql),
            "mysql" => Some(Self::Mysql),
            "mariadb" => Some(Self::Mariadb),
            "postgres" | "postgresql" => Some(Self::Postgres),
            "aurora_mysql" | "aurora-mysql" => Some(Self::AuroraMysql),
            "aurora_postgres" | "aurora-postgres" | "aurora_postgresql" => {
                Some(Self::AuroraPostgres)
            }
            _ => None,
        }
    }

    /// 表名比较是否区分大小写（MSSQL 默认排序规则不区分）
    pub fn table_names_case_sensitive(self) -> bool {
        !matches!(self.family(), DialectFamily::Mssql)
    }

    /// 列名比较是否区分大小写（MySQL 与 MSSQL 列名不区分）
    pub fn column_names_case_sensitive(self) -> bool {
        matches!(self.family(), DialectFamily::Postgres)
    }

    /// 从 dump 内容识别方言，无法判断时回退到 MySQL
    pub fn detect(content: &str) -> Self {
        let lower = content.to_lowercase();

        // 头部注释
        if lower.contains("postgresql database dump") || lower.contains("pg_dump") {
            return Self::Postgres;
        }
        if lower.contains("mariadb dump") {
            return Self::Mariadb;
        }
        if lower.contains("mysql dump") || lower.contains("mysqldump") {
            return Self::Mysql;
        }
        if lower.contains("sql server") || lower.contains("set ansi_nulls") {
            return Self::Mssql;
        }

        // 类型与语法关键字
        if lower.contains("auto_increment") || lower.contains("engine=") || lower.contains('`') {
            return Self::Mysql;
        }
        if lower.contains("identity(")
            || lower.contains("nvarchar")
            || lower.contains("[dbo]")
            || lower.lines().any(|line| line.trim() == "go")
        {
            return Self::Mssql;
        }
        if lower.contains("serial")
            || lower.contains("::")
            || lower.contains("timestamptz")
            || lower.contains("returning")
        {
            return Self::Postgres;
        }

        Self::Mysql
    }
}

impl fmt::Display for SourceDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 目标库方言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetDialect {
    #[default]
    Snowflake,
}

impl TargetDialect {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetDialect::Snowflake => "snowflake",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TargetDialect::Snowflake => "Snowflake",
        }
    }
}

impl fmt::Display for TargetDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 连接描述中的数据库类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DbType {
    Mssql,
    Mysql,
    Postgres,
    Snowflake,
}

impl DbType {
    /// 作为分析源时对应的方言；snowflake 只能作为目标库探测
    pub fn source_dialect(self) -> Option<SourceDialect> {
        match self {
            DbType::Mssql => Some(SourceDialect::Mssql),
            DbType::Mysql => Some(SourceDialect::Mysql),
            DbType::Postgres => Some(SourceDialect::Postgres),
            DbType::Snowflake => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DbType::Mssql => "mssql",
            DbType::Mysql => "mysql",
            DbType::Postgres => "postgres",
            DbType::Snowflake => "snowflake",
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
