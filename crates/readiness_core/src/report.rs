use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Blocking,
    Warning,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
}

/// Why a result failed. Only `CheckCrash` signals an internal error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingData,
    Io,
    Parse,
    CheckCrash,
}

/// One item inside a check, such as a single required path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Detail {
    pub status: CheckStatus,
    pub message: String,
}

impl Detail {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Pass,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub section: String,
    pub status: CheckStatus,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Detail>,
}

impl CheckResult {
    pub fn is_blocking_failure(&self) -> bool {
        self.status == CheckStatus::Fail && self.severity == Severity::Blocking
    }

    pub fn is_warning(&self) -> bool {
        self.status == CheckStatus::Fail && self.severity == Severity::Warning
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Ready,
    NotReady,
}

impl OverallStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            OverallStatus::Ready => 0,
            OverallStatus::NotReady => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub overall: OverallStatus,
    pub results: Vec<CheckResult>,
}

impl Verdict {
    pub fn from_results(results: Vec<CheckResult>) -> Self {
        let overall = if results.iter().any(CheckResult::is_blocking_failure) {
            OverallStatus::NotReady
        } else {
            OverallStatus::Ready
        };
        Self { overall, results }
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for result in &self.results {
            if result.is_blocking_failure() {
                summary.failed += 1;
            } else if result.is_warning() {
                summary.warnings += 1;
            } else {
                summary.passed += 1;
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSummary {
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
}

/// Serializable record of one run, written by `check --format json` and the
/// `[report]` config section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub id: String,
    pub timestamp: String,
    pub root: PathBuf,
    pub summary: ReportSummary,
    pub verdict: Verdict,
}

impl ReadinessReport {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>, verdict: Verdict) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now().to_rfc3339(),
            root: root.into(),
            summary: verdict.summary(),
            verdict,
        }
    }
}
