use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading project state into a snapshot.
///
/// Absence of a file or variable is never one of these; checks treat
/// absence as data.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("project root {} is not a readable directory", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is {size} bytes, above the {limit} byte read budget", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("failed to parse manifest {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to walk {}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("check name `{0}` is used more than once")]
    DuplicateCheck(String),
    #[error("check name {0:?} must be non-empty, trimmed, single-line and free of \": \"")]
    InvalidName(String),
    #[error("check `{0}` has no patterns")]
    NoPatterns(String),
    #[error("check `{0}` has no paths")]
    NoPaths(String),
    #[error("check `{check}` has an invalid regex `{pattern}`")]
    Regex {
        check: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("{} already exists; remove it first to recreate it", path.display())]
    AlreadyExists { path: PathBuf },
    #[error("invalid {step}: {reason}")]
    Invalid { step: &'static str, reason: &'static str },
    #[error("input ended before {step} was answered")]
    Eof { step: &'static str },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
