pub mod adapter;
pub mod analysis;
pub mod config;
pub mod constants;
pub mod ddl;
pub mod dialect;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod model;
pub mod risk;

pub use adapter::live::ConnectionDescriptor;
pub use adapter::{AnalysisSource, DumpSource};
pub use analysis::{
    AnalysisResult, AnalysisRun, Analyzer, ConnectionProbe, FailureKind, RunStatus,
};
pub use config::EngineConfig;
pub use dialect::{DbType, SourceDialect, TargetDialect};
pub use error::{AnalyzerError, Result};
pub use logging::setup_logging;
pub use mapping::{TypeMapping, map_type};
pub use model::SchemaModel;
pub use risk::{Risk, RiskType, RuleSet, Severity};
