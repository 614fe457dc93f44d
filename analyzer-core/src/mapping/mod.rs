//! 源类型到目标类型的映射
//!
//! 映射只给出目标类型和映射结果，不产生风险；风险由 [`crate::risk`] 根据
//! [`MappingOutcome`] 判断。

mod snowflake;

use crate::dialect::{SourceDialect, TargetDialect};
use crate::model::SourceType;

/// 映射结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapping {
    pub target_type: String,
    pub outcome: MappingOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingOutcome {
    Exact,
    Lossy(LossKind),
    /// 没有对应的映射条目，使用兜底类型
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    /// 精度/小数位超出目标范围，或源类型未约束精度
    Precision {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    /// 声明长度（或类型隐含容量）超出目标上限
    Truncated { declared: u64, max: u64 },
    /// 目标类型能存下数据，但语义不同（ENUM、XML、几何类型等）
    Semantic,
}

impl TypeMapping {
    pub(crate) fn exact(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            outcome: MappingOutcome::Exact,
        }
    }

    pub(crate) fn lossy(target_type: impl Into<String>, loss: LossKind) -> Self {
        Self {
            target_type: target_type.into(),
            outcome: MappingOutcome::Lossy(loss),
        }
    }

    pub fn is_exact(&self) -> bool {
        self.outcome == MappingOutcome::Exact
    }

    pub fn is_fallback(&self) -> bool {
        self.outcome == MappingOutcome::Fallback
    }
}

/// 映射单个列类型
pub fn map_type(
    source: SourceDialect,
    target: TargetDialect,
    source_type: &SourceType,
) -> TypeMapping {
    match target {
        TargetDialect::Snowflake => snowflake::map(source.family(), source_type),
    }
}

/// 映射表中声明的全部源类型名
pub fn declared_types(source: SourceDialect, target: TargetDialect) -> Vec<&'static str> {
    match target {
        TargetDialect::Snowflake => snowflake::declared_types(source.family()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snowflake(dialect: SourceDialect, raw: &str) -> TypeMapping {
        map_type(dialect, TargetDialect::Snowflake, &SourceType::parse(raw))
    }

    #[test]
    fn test_every_declared_type_has_a_target() {
        for dialect in SourceDialect::ALL {
            let declared = declared_types(dialect, TargetDialect::Snowflake);
            assert!(!declared.is_empty());
            for name in declared {
                let mapping = snowflake(dialect, name);
                assert!(
                    !mapping.target_type.is_empty(),
                    "{} {name} 没有目标类型",
                    dialect.as_str()
                );
                assert!(
                    !mapping.is_fallback(),
                    "{} {name} 落入兜底映射",
                    dialect.as_str()
                );
            }
        }
    }

    #[test]
    fn test_mysql_mappings() {
        let m = snowflake(SourceDialect::Mysql, "tinyint(1)");
        assert_eq!(m, TypeMapping::exact("BOOLEAN"));

        let m = snowflake(SourceDialect::Mysql, "tinyint(4)");
        assert_eq!(m.target_type, "SMALLINT");

        let m = snowflake(SourceDialect::Mysql, "int(10) unsigned");
        assert_eq!(m, TypeMapping::exact("BIGINT"));

        let m = snowflake(SourceDialect::Mysql, "decimal(10,2)");
        assert_eq!(m, TypeMapping::exact("NUMBER(10,2)"));

        let m = snowflake(SourceDialect::Mysql, "DECIMAL");
        assert_eq!(m, TypeMapping::exact("NUMBER(10,0)"));

        let m = snowflake(SourceDialect::Mysql, "VARCHAR(255)");
        assert_eq!(m, TypeMapping::exact("VARCHAR(255)"));

        let m = snowflake(SourceDialect::Mysql, "text");
        assert_eq!(m, TypeMapping::exact("VARCHAR(65535)"));

        let m = snowflake(SourceDialect::Mariadb, "enum('a','b')");
        assert_eq!(m.outcome, MappingOutcome::Lossy(LossKind::Semantic));

        let m = snowflake(SourceDialect::AuroraMysql, "datetime(6)");
        assert_eq!(m, TypeMapping::exact("TIMESTAMP_NTZ(6)"));
    }

    #[test]
    fn test_oversized_lengths_are_truncated() {
        let m = snowflake(SourceDialect::Mysql, "VARCHAR(20000000)");
        assert_eq!(m.target_type, "VARCHAR(16777216)");
        assert_eq!(
            m.outcome,
            MappingOutcome::Lossy(LossKind::Truncated {
                declared: 20_000_000,
                max: 16_777_216
            })
        );

        let m = snowflake(SourceDialect::Mysql, "longtext");
        assert_eq!(m.target_type, "VARCHAR(16777216)");
        assert!(matches!(
            m.outcome,
            MappingOutcome::Lossy(LossKind::Truncated { .. })
        ));

        let m = snowflake(SourceDialect::Mysql, "mediumblob");
        assert_eq!(m.target_type, "BINARY(8388608)");
        assert!(!m.is_exact());
    }

    #[test]
    fn test_large_object_types_are_truncated() {
        let mssql_lob = |max| LossKind::Truncated {
            declared: 2_147_483_647,
            max,
        };
        let m = snowflake(SourceDialect::Mssql, "[nvarchar](max)");
        assert_eq!(m, TypeMapping::lossy("VARCHAR(16777216)", mssql_lob(16_777_216)));
        let m = snowflake(SourceDialect::Mssql, "varchar(MAX)");
        assert_eq!(m, TypeMapping::lossy("VARCHAR(16777216)", mssql_lob(16_777_216)));
        let m = snowflake(SourceDialect::Mssql, "varbinary(max)");
        assert_eq!(m, TypeMapping::lossy("BINARY(8388608)", mssql_lob(8_388_608)));
        let m = snowflake(SourceDialect::Mssql, "ntext");
        assert_eq!(m, TypeMapping::lossy("VARCHAR(16777216)", mssql_lob(16_777_216)));
        let m = snowflake(SourceDialect::Mssql, "image");
        assert_eq!(m, TypeMapping::lossy("BINARY(8388608)", mssql_lob(8_388_608)));

        let m = snowflake(SourceDialect::Postgres, "text");
        assert_eq!(
            m,
            TypeMapping::lossy(
                "VARCHAR(16777216)",
                LossKind::Truncated {
                    declared: 1_073_741_824,
                    max: 16_777_216
                }
            )
        );
        let m = snowflake(SourceDialect::Postgres, "bytea");
        assert_eq!(m.target_type, "BINARY(8388608)");
        assert!(matches!(
            m.outcome,
            MappingOutcome::Lossy(LossKind::Truncated {
                declared: 1_073_741_824,
                ..
            })
        ));
    }

    #[test]
    fn test_numeric_precision() {
        let m = snowflake(SourceDialect::Mysql, "decimal(65,30)");
        assert_eq!(m.target_type, "NUMBER(38,30)");
        assert_eq!(
            m.outcome,
            MappingOutcome::Lossy(LossKind::Precision {
                precision: Some(65),
                scale: Some(30)
            })
        );

        let m = snowflake(SourceDialect::Postgres, "numeric");
        assert_eq!(m.target_type, "NUMBER(38,0)");
        assert_eq!(
            m.outcome,
            MappingOutcome::Lossy(LossKind::Precision {
                precision: None,
                scale: None
            })
        );

        let m = snowflake(SourceDialect::Postgres, "numeric(12,4)");
        assert_eq!(m, TypeMapping::exact("NUMBER(12,4)"));
    }

    #[test]
    fn test_postgres_mappings() {
        let m = snowflake(SourceDialect::Postgres, "timestamp(6) with time zone");
        assert_eq!(m, TypeMapping::exact("TIMESTAMP_TZ(6)"));

        let m = snowflake(SourceDialect::AuroraPostgres, "character varying(100)");
        assert_eq!(m, TypeMapping::exact("VARCHAR(100)"));

        let m = snowflake(SourceDialect::Postgres, "character varying");
        assert_eq!(m, TypeMapping::exact("VARCHAR"));

        let m = snowflake(SourceDialect::Postgres, "integer[]");
        assert_eq!(m, TypeMapping::lossy("ARRAY", LossKind::Semantic));

        let m = snowflake(SourceDialect::Postgres, "jsonb");
        assert_eq!(m, TypeMapping::exact("VARIANT"));
    }

    #[test]
    fn test_mssql_mappings() {
        let m = snowflake(SourceDialect::Mssql, "nvarchar(200)");
        assert_eq!(m, TypeMapping::exact("VARCHAR(200)"));

        let m = snowflake(SourceDialect::Mssql, "money");
        assert_eq!(m, TypeMapping::exact("NUMBER(19,4)"));

        let m = snowflake(SourceDialect::Mssql, "datetime");
        assert_eq!(m, TypeMapping::exact("TIMESTAMP_NTZ(3)"));

        let m = snowflake(SourceDialect::Mssql, "datetime2(7)");
        assert_eq!(m, TypeMapping::exact("TIMESTAMP_NTZ(7)"));

        let m = snowflake(SourceDialect::Mssql, "xml");
        assert_eq!(m.outcome, MappingOutcome::Lossy(LossKind::Semantic));

        let m = snowflake(SourceDialect::Mssql, "decimal");
        assert_eq!(m, TypeMapping::exact("NUMBER(18,0)"));
    }

    #[test]
    fn test_unknown_type_falls_back() {
        let m = snowflake(SourceDialect::Postgres, "public.order_status");
        assert_eq!(m.target_type, "VARCHAR");
        assert!(m.is_fallback());
    }
}
