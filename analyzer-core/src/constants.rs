/// Snowflake 目标库限制
pub mod snowflake {
    /// VARCHAR 最大长度（字符数，16 MiB）
    pub const MAX_VARCHAR_LENGTH: u64 = 16_777_216;

    /// BINARY 最大长度（字节数，8 MiB）
    pub const MAX_BINARY_LENGTH: u64 = 8_388_608;

    /// NUMBER 最大精度
    pub const MAX_NUMBER_PRECISION: u32 = 38;

    /// NUMBER 最大小数位
    pub const MAX_NUMBER_SCALE: u32 = 37;

    /// 无映射类型的兜底类型
    pub const FALLBACK_TYPE: &str = "VARCHAR";

    /// 需要加引号的保留字（大写）
    pub const RESERVED_WORDS: &[&str] = &[
        "ACCOUNT", "ALL", "ALTER", "AND", "ANY", "AS", "BETWEEN", "BY", "CASE", "CAST", "CHECK",
        "COLUMN", "CONNECT", "CONNECTION", "CONSTRAINT", "CREATE", "CROSS", "CURRENT",
        "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "DATABASE",
        "DELETE", "DISTINCT", "DROP", "ELSE", "EXISTS", "FALSE", "FOLLOWING", "FOR", "FROM",
        "FULL", "GRANT", "GROUP", "GSCLUSTER", "HAVING", "ILIKE", "IN", "INCREMENT", "INNER",
        "INSERT", "INTERSECT", "INTO", "IS", "ISSUE", "JOIN", "LATERAL", "LEFT", "LIKE",
        "LOCALTIME", "LOCALTIMESTAMP", "MINUS", "NATURAL", "NOT", "NULL", "OF", "ON", "OR",
        "ORDER", "ORGANIZATION", "QUALIFY", "REGEXP", "REVOKE", "RIGHT", "RLIKE", "ROW", "ROWS",
        "SAMPLE", "SCHEMA", "SELECT", "SET", "SOME", "START", "TABLE", "TABLESAMPLE", "THEN",
        "TO", "TRIGGER", "TRUE", "TRY_CAST", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES",
        "VIEW", "WHEN", "WHENEVER", "WHERE", "WITH",
    ];
}

/// 分析流程相关常量
pub mod analysis {
    /// 在线抽取默认超时（秒）
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// 大表阈值（行数估计）
    pub const DEFAULT_LARGE_TABLE_ROWS: u64 = 1_000_000;

    /// dump 模式下未声明数据库名时使用的名字
    pub const DUMP_DATABASE_NAME: &str = "uploaded_schema";

    /// 允许上传的 dump 文件扩展名
    pub const DUMP_FILE_EXTENSION: &str = ".sql";
}

/// 在线连接相关常量
pub mod live {
    /// PostgreSQL 默认 schema
    pub const DEFAULT_POSTGRES_SCHEMA: &str = "public";

    /// MSSQL 默认 schema
    pub const DEFAULT_MSSQL_SCHEMA: &str = "dbo";
}

/// 配置文件相关常量
pub mod config {
    /// 按优先级查找的配置文件名
    pub const CONFIG_FILE_NAMES: &[&str] = &["analyzer.toml", ".analyzer.toml"];

    /// 默认日志级别
    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// 日志文件环境变量
    pub const LOG_FILE_ENV: &str = "ANALYZER_LOG_FILE";
}
