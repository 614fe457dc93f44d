use super::{LossKind, MappingOutcome, TypeMapping};
use crate::constants::snowflake::{
    FALLBACK_TYPE, MAX_BINARY_LENGTH, MAX_NUMBER_PRECISION, MAX_NUMBER_SCALE, MAX_VARCHAR_LENGTH,
};
use crate::dialect::DialectFamily;
use crate::model::SourceType;

/// 单条映射规则
#[derive(Debug, Clone, Copy)]
enum Rule {
    /// 固定目标类型
    Fixed(&'static str),
    /// 固定目标类型，语义有损
    Semantic(&'static str),
    /// 整数类型，unsigned 时放宽
    Integer {
        signed: &'static str,
        unsigned: &'static str,
    },
    /// DECIMAL / NUMERIC，`default` 为未声明精度时源库采用的 (p, s)
    Decimal { default: Option<(u32, u32)> },
    /// 带声明长度的字符串/二进制；MSSQL `(max)` 按 LOB 容量计
    Sized { target: &'static str, max: u64 },
    /// 长度由类型本身决定（TEXT、BLOB 系列）
    Capacity {
        target: &'static str,
        capacity: u64,
        max: u64,
    },
    /// 带小数秒精度的时间类型
    Temporal(&'static str),
}

/// MSSQL `(max)` 与 text/ntext/image 的容量（2 GB）
const MSSQL_LOB_CAPACITY: u64 = 2_147_483_647;

/// PostgreSQL 单个字段值上限（1 GB）
const POSTGRES_FIELD_CAPACITY: u64 = 1_073_741_824;

const MYSQL_TYPES: &[(&str, Rule)] = &[
    ("tinyint", Rule::Integer { signed: "SMALLINT", unsigned: "SMALLINT" }),
    ("smallint", Rule::Integer { signed: "SMALLINT", unsigned: "INTEGER" }),
    ("mediumint", Rule::Integer { signed: "INTEGER", unsigned: "INTEGER" }),
    ("int", Rule::Integer { signed: "INTEGER", unsigned: "BIGINT" }),
    ("integer", Rule::Integer { signed: "INTEGER", unsigned: "BIGINT" }),
    ("bigint", Rule::Integer { signed: "BIGINT", unsigned: "NUMBER(20,0)" }),
    ("float", Rule::Fixed("FLOAT")),
    ("double", Rule::Fixed("DOUBLE")),
    ("double precision", Rule::Fixed("DOUBLE")),
    ("real", Rule::Fixed("DOUBLE")),
    ("decimal", Rule::Decimal { default: Some((10, 0)) }),
    ("numeric", Rule::Decimal { default: Some((10, 0)) }),
    ("dec", Rule::Decimal { default: Some((10, 0)) }),
    ("fixed", Rule::Decimal { default: Some((10, 0)) }),
    ("bool", Rule::Fixed("BOOLEAN")),
    ("boolean", Rule::Fixed("BOOLEAN")),
    ("char", Rule::Sized { target: "CHAR", max: MAX_VARCHAR_LENGTH }),
    ("varchar", Rule::Sized { target: "VARCHAR", max: MAX_VARCHAR_LENGTH }),
    ("tinytext", Rule::Capacity { target: "VARCHAR", capacity: 255, max: MAX_VARCHAR_LENGTH }),
    ("text", Rule::Capacity { target: "VARCHAR", capacity: 65_535, max: MAX_VARCHAR_LENGTH }),
    ("mediumtext", Rule::Capacity { target: "VARCHAR", capacity: 16_777_215, max: MAX_VARCHAR_LENGTH }),
    ("longtext", Rule::Capacity { target: "VARCHAR", capacity: 4_294_967_295, max: MAX_VARCHAR_LENGTH }),
    ("binary", Rule::Sized { target: "BINARY", max: MAX_BINARY_LENGTH }),
    ("varbinary", Rule::Sized { target: "BINARY", max: MAX_BINARY_LENGTH }),
    ("tinyblob", Rule::Capacity { target: "BINARY", capacity: 255, max: MAX_BINARY_LENGTH }),
    ("blob", Rule::Capacity { target: "BINARY", capacity: 65_535, max: MAX_BINARY_LENGTH }),
    ("mediumblob", Rule::Capacity { target: "BINARY", capacity: 16_777_215, max: MAX_BINARY_LENGTH }),
    ("longblob", Rule::Capacity { target: "BINARY", capacity: 4_294_967_295, max: MAX_BINARY_LENGTH }),
    ("date", Rule::Fixed("DATE")),
    ("time", Rule::Temporal("TIME")),
    ("datetime", Rule::Temporal("TIMESTAMP_NTZ")),
    ("timestamp", Rule::Temporal("TIMESTAMP_NTZ")),
    ("year", Rule::Semantic("SMALLINT")),
    ("json", Rule::Semantic("VARIANT")),
    ("enum", Rule::Semantic("VARCHAR(255)")),
    ("set", Rule::Semantic("VARCHAR(1024)")),
    ("bit", Rule::Semantic("BINARY")),
    ("geometry", Rule::Semantic("GEOMETRY")),
    ("point", Rule::Semantic("GEOMETRY")),
    ("linestring", Rule::Semantic("GEOMETRY")),
    ("polygon", Rule::Semantic("GEOMETRY")),
    ("multipoint", Rule::Semantic("GEOMETRY")),
    ("multilinestring", Rule::Semantic("GEOMETRY")),
    ("multipolygon", Rule::Semantic("GEOMETRY")),
    ("geometrycollection", Rule::Semantic("GEOMETRY")),
    // MariaDB
    ("uuid", Rule::Fixed("VARCHAR(36)")),
    ("inet4", Rule::Semantic("VARCHAR(15)")),
    ("inet6", Rule::Semantic("VARCHAR(39)")),
];

const POSTGRES_TYPES: &[(&str, Rule)] = &[
    ("smallint", Rule::Fixed("SMALLINT")),
    ("int2", Rule::Fixed("SMALLINT")),
    ("integer", Rule::Fixed("INTEGER")),
    ("int", Rule::Fixed("INTEGER")),
    ("int4", Rule::Fixed("INTEGER")),
    ("bigint", Rule::Fixed("BIGINT")),
    ("int8", Rule::Fixed("BIGINT")),
    ("smallserial", Rule::Fixed("SMALLINT")),
    ("serial2", Rule::Fixed("SMALLINT")),
    ("serial", Rule::Fixed("INTEGER")),
    ("serial4", Rule::Fixed("INTEGER")),
    ("bigserial", Rule::Fixed("BIGINT")),
    ("serial8", Rule::Fixed("BIGINT")),
    ("real", Rule::Fixed("FLOAT")),
    ("float4", Rule::Fixed("FLOAT")),
    ("double precision", Rule::Fixed("DOUBLE")),
    ("float8", Rule::Fixed("DOUBLE")),
    ("float", Rule::Fixed("DOUBLE")),
    ("numeric", Rule::Decimal { default: None }),
    ("decimal", Rule::Decimal { default: None }),
    ("money", Rule::Fixed("NUMBER(19,2)")),
    ("character varying", Rule::Sized { target: "VARCHAR", max: MAX_VARCHAR_LENGTH }),
    ("varchar", Rule::Sized { target: "VARCHAR", max: MAX_VARCHAR_LENGTH }),
    ("character", Rule::Sized { target: "CHAR", max: MAX_VARCHAR_LENGTH }),
    ("char", Rule::Sized { target: "CHAR", max: MAX_VARCHAR_LENGTH }),
    ("bpchar", Rule::Sized { target: "CHAR", max: MAX_VARCHAR_LENGTH }),
    ("text", Rule::Capacity { target: "VARCHAR", capacity: POSTGRES_FIELD_CAPACITY, max: MAX_VARCHAR_LENGTH }),
    ("citext", Rule::Fixed("VARCHAR")),
    ("bytea", Rule::Capacity { target: "BINARY", capacity: POSTGRES_FIELD_CAPACITY, max: MAX_BINARY_LENGTH }),
    ("boolean", Rule::Fixed("BOOLEAN")),
    ("bool", Rule::Fixed("BOOLEAN")),
    ("date", Rule::Fixed("DATE")),
    ("time", Rule::Temporal("TIME")),
    ("time without time zone", Rule::Temporal("TIME")),
    ("time with time zone", Rule::Semantic("TIME")),
    ("timetz", Rule::Semantic("TIME")),
    ("timestamp", Rule::Temporal("TIMESTAMP_NTZ")),
    ("timestamp without time zone", Rule::Temporal("TIMESTAMP_NTZ")),
    ("timestamp with time zone", Rule::Temporal("TIMESTAMP_TZ")),
    ("timestamptz", Rule::Temporal("TIMESTAMP_TZ")),
    ("interval", Rule::Semantic("VARCHAR")),
    ("uuid", Rule::Fixed("VARCHAR(36)")),
    ("json", Rule::Fixed("VARIANT")),
    ("jsonb", Rule::Fixed("VARIANT")),
    ("xml", Rule::Semantic("VARCHAR")),
    ("inet", Rule::Semantic("VARCHAR")),
    ("cidr", Rule::Semantic("VARCHAR")),
    ("macaddr", Rule::Semantic("VARCHAR")),
    ("bit", Rule::Semantic("VARCHAR")),
    ("bit varying", Rule::Semantic("VARCHAR")),
    ("varbit", Rule::Semantic("VARCHAR")),
    ("tsvector", Rule::Semantic("VARCHAR")),
    // 扩展类型
    ("hstore", Rule::Semantic("OBJECT")),
    ("geometry", Rule::Semantic("GEOMETRY")),
    ("geography", Rule::Semantic("GEOGRAPHY")),
    ("ltree", Rule::Semantic("VARCHAR")),
    ("vector", Rule::Semantic("ARRAY")),
];

const MSSQL_TYPES: &[(&str, Rule)] = &[
    ("tinyint", Rule::Fixed("SMALLINT")),
    ("smallint", Rule::Fixed("SMALLINT")),
    ("int", Rule::Fixed("INTEGER")),
    ("bigint", Rule::Fixed("BIGINT")),
    ("bit", Rule::Fixed("BOOLEAN")),
    ("decimal", Rule::Decimal { default: Some((18, 0)) }),
    ("numeric", Rule::Decimal { default: Some((18, 0)) }),
    ("money", Rule::Fixed("NUMBER(19,4)")),
    ("smallmoney", Rule::Fixed("NUMBER(10,4)")),
    ("float", Rule::Fixed("FLOAT")),
    ("real", Rule::Fixed("FLOAT")),
    ("char", Rule::Sized { target: "CHAR", max: MAX_VARCHAR_LENGTH }),
    ("nchar", Rule::Sized { target: "CHAR", max: MAX_VARCHAR_LENGTH }),
    ("varchar", Rule::Sized { target: "VARCHAR", max: MAX_VARCHAR_LENGTH }),
    ("nvarchar", Rule::Sized { target: "VARCHAR", max: MAX_VARCHAR_LENGTH }),
    ("text", Rule::Capacity { target: "VARCHAR", capacity: MSSQL_LOB_CAPACITY, max: MAX_VARCHAR_LENGTH }),
    ("ntext", Rule::Capacity { target: "VARCHAR", capacity: MSSQL_LOB_CAPACITY, max: MAX_VARCHAR_LENGTH }),
    ("binary", Rule::Sized { target: "BINARY", max: MAX_BINARY_LENGTH }),
    ("varbinary", Rule::Sized { target: "BINARY", max: MAX_BINARY_LENGTH }),
    ("image", Rule::Capacity { target: "BINARY", capacity: MSSQL_LOB_CAPACITY, max: MAX_BINARY_LENGTH }),
    ("date", Rule::Fixed("DATE")),
    ("time", Rule::Temporal("TIME")),
    ("datetime", Rule::Fixed("TIMESTAMP_NTZ(3)")),
    ("smalldatetime", Rule::Fixed("TIMESTAMP_NTZ(0)")),
    ("datetime2", Rule::Temporal("TIMESTAMP_NTZ")),
    ("datetimeoffset", Rule::Temporal("TIMESTAMP_TZ")),
    ("uniqueidentifier", Rule::Fixed("VARCHAR(36)")),
    ("xml", Rule::Semantic("VARCHAR")),
    ("geography", Rule::Semantic("GEOGRAPHY")),
    ("geometry", Rule::Semantic("GEOMETRY")),
    ("hierarchyid", Rule::Semantic("VARCHAR")),
    ("sql_variant", Rule::Semantic("VARIANT")),
    // MSSQL 的 timestamp 是行版本号，不是时间
    ("timestamp", Rule::Semantic("BINARY(8)")),
    ("rowversion", Rule::Semantic("BINARY(8)")),
];

/// Snowflake 时间类型小数秒最大位数
const MAX_FRACTIONAL_DIGITS: u32 = 9;

fn table_for(family: DialectFamily) -> &'static [(&'static str, Rule)] {
    match family {
        DialectFamily::Mysql => MYSQL_TYPES,
        DialectFamily::Postgres => POSTGRES_TYPES,
        DialectFamily::Mssql => MSSQL_TYPES,
    }
}

pub(super) fn declared_types(family: DialectFamily) -> Vec<&'static str> {
    table_for(family).iter().map(|(name, _)| *name).collect()
}

pub(super) fn map(family: DialectFamily, source_type: &SourceType) -> TypeMapping {
    if source_type.array {
        return TypeMapping::lossy("ARRAY", LossKind::Semantic);
    }

    // TINYINT(1) 是 MySQL 的布尔约定
    if family == DialectFamily::Mysql
        && source_type.name == "tinyint"
        && source_type.length == Some(1)
    {
        return TypeMapping::exact("BOOLEAN");
    }

    match table_for(family)
        .iter()
        .find(|(name, _)| *name == source_type.name)
    {
        Some((_, rule)) => apply(*rule, source_type),
        None => TypeMapping {
            target_type: FALLBACK_TYPE.to_string(),
            outcome: MappingOutcome::Fallback,
        },
    }
}

fn apply(rule: Rule, source_type: &SourceType) -> TypeMapping {
    match rule {
        Rule::Fixed(target) => TypeMapping::exact(target),
        Rule::Semantic(target) => TypeMapping::lossy(target, LossKind::Semantic),
        Rule::Integer { signed, unsigned } => {
            TypeMapping::exact(if source_type.unsigned { unsigned } else { signed })
        }
        Rule::Decimal { default } => map_decimal(source_type, default),
        Rule::Sized { target, max } if source_type.max => capped(target, MSSQL_LOB_CAPACITY, max),
        Rule::Sized { target, max } => match source_type.declared_length() {
            Some(length) => capped(target, length, max),
            None => TypeMapping::exact(target),
        },
        Rule::Capacity {
            target,
            capacity,
            max,
        } => capped(target, capacity, max),
        Rule::Temporal(target) => match source_type.precision {
            Some(digits) => {
                TypeMapping::exact(format!("{target}({})", digits.min(MAX_FRACTIONAL_DIGITS)))
            }
            None => TypeMapping::exact(target),
        },
    }
}

fn capped(target: &str, declared: u64, max: u64) -> TypeMapping {
    if declared > max {
        TypeMapping::lossy(format!("{target}({max})"), LossKind::Truncated { declared, max })
    } else {
        TypeMapping::exact(format!("{target}({declared})"))
    }
}

fn map_decimal(source_type: &SourceType, default: Option<(u32, u32)>) -> TypeMapping {
    let (precision, scale) = match (source_type.precision, default) {
        (Some(precision), _) => (precision, source_type.scale.unwrap_or(0)),
        (None, Some(default)) => default,
        // 未约束精度的 NUMERIC 可存任意位数
        (None, None) => {
            return TypeMapping::lossy(
                format!("NUMBER({MAX_NUMBER_PRECISION},0)"),
                LossKind::Precision {
                    precision: None,
                    scale: None,
                },
            );
        }
    };

    if precision > MAX_NUMBER_PRECISION || scale > MAX_NUMBER_SCALE {
        let capped_precision = precision.min(MAX_NUMBER_PRECISION);
        let capped_scale = scale.min(MAX_NUMBER_SCALE).min(capped_precision);
        return TypeMapping::lossy(
            format!("NUMBER({capped_precision},{capped_scale})"),
            LossKind::Precision {
                precision: Some(precision),
                scale: Some(scale),
            },
        );
    }

    TypeMapping::exact(format!("NUMBER({precision},{scale})"))
}
