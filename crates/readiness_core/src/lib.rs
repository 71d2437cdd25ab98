pub mod checks;
pub mod config;
pub mod error;
pub mod registry;
pub mod render;
pub mod report;
pub mod runner;
pub mod snapshot;
pub mod wizard;

pub use checks::{Check, CheckMeta, Evaluation};
pub use config::{ReadinessConfig, SnapshotConfig};
pub use error::{ConfigError, SnapshotError, WizardError};
pub use registry::Registry;
pub use render::{parse_text_report, render_text};
pub use report::{
    CheckResult, CheckStatus, Detail, FailureKind, OverallStatus, ReadinessReport, ReportSummary,
    Severity, Verdict,
};
pub use runner::{run_checks, run_validations, ValidationOptions};
pub use snapshot::Snapshot;
