use std::fmt;
use std::path::PathBuf;

use regex::Regex;
use serde::Deserialize;

use crate::error::SnapshotError;
use crate::report::{CheckStatus, Detail, FailureKind, Severity};
use crate::snapshot::Snapshot;

/// A named rule evaluated against a [`Snapshot`].
///
/// Expected absence (a missing variable, file or dependency) must come back
/// as a failing [`Evaluation`]. `Err` is reserved for files that exist but
/// cannot be read and manifests that do not parse.
pub trait Check {
    fn meta(&self) -> &CheckMeta;

    fn evaluate(&self, snapshot: &Snapshot) -> Result<Evaluation, SnapshotError>;

    fn name(&self) -> &str {
        &self.meta().name
    }

    fn section(&self) -> &str {
        &self.meta().section
    }

    fn severity(&self) -> Severity {
        self.meta().severity
    }
}

#[derive(Debug, Clone)]
pub struct CheckMeta {
    pub name: String,
    pub section: String,
    pub severity: Severity,
}

impl CheckMeta {
    pub fn new(name: impl Into<String>, section: impl Into<String>, severity: Severity) -> Self {
        Self {
            name: name.into(),
            section: section.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub status: CheckStatus,
    pub message: String,
    pub failure: Option<FailureKind>,
    pub details: Vec<Detail>,
}

impl Evaluation {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Pass,
            message: message.into(),
            failure: None,
            details: Vec::new(),
        }
    }

    pub fn fail(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            message: message.into(),
            failure: Some(kind),
            details: Vec::new(),
        }
    }

    /// Validation failure that is not a missing-data condition.
    pub fn violation(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            message: message.into(),
            failure: None,
            details: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<Detail>) -> Self {
        self.details = details;
        self
    }
}

/// Fails when a variable is absent or empty.
#[derive(Debug, Clone)]
pub struct EnvVarCheck {
    meta: CheckMeta,
    var: String,
}

impl EnvVarCheck {
    pub fn new(
        name: impl Into<String>,
        section: impl Into<String>,
        severity: Severity,
        var: impl Into<String>,
    ) -> Self {
        Self {
            meta: CheckMeta::new(name, section, severity),
            var: var.into(),
        }
    }
}

impl Check for EnvVarCheck {
    fn meta(&self) -> &CheckMeta {
        &self.meta
    }

    fn evaluate(&self, snapshot: &Snapshot) -> Result<Evaluation, SnapshotError> {
        Ok(match snapshot.env_var(&self.var) {
            Some(value) if !value.is_empty() => Evaluation::pass(format!("{} is set", self.var)),
            Some(_) => Evaluation::fail(FailureKind::MissingData, format!("{} is empty", self.var)),
            None => Evaluation::fail(
                FailureKind::MissingData,
                format!("{} not found in environment", self.var),
            ),
        })
    }
}

/// Fails when any listed path is missing, with one detail per path.
#[derive(Debug, Clone)]
pub struct RequiredFilesCheck {
    meta: CheckMeta,
    paths: Vec<PathBuf>,
}

impl RequiredFilesCheck {
    pub fn new(
        name: impl Into<String>,
        section: impl Into<String>,
        severity: Severity,
        paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            meta: CheckMeta::new(name, section, severity),
            paths,
        }
    }
}

impl Check for RequiredFilesCheck {
    fn meta(&self) -> &CheckMeta {
        &self.meta
    }

    fn evaluate(&self, snapshot: &Snapshot) -> Result<Evaluation, SnapshotError> {
        let details: Vec<Detail> = self
            .paths
            .iter()
            .map(|path| {
                if snapshot.exists(path) {
                    Detail::pass(format!("{} exists", path.display()))
                } else {
                    Detail::fail(format!("{} missing", path.display()))
                }
            })
            .collect();
        let missing = details.iter().filter(|d| d.status == CheckStatus::Fail).count();

        let evaluation = if missing == 0 {
            Evaluation::pass(format!("all {} required files present", self.paths.len()))
        } else {
            Evaluation::fail(
                FailureKind::MissingData,
                format!("{missing} of {} required files missing", self.paths.len()),
            )
        };
        Ok(evaluation.with_details(details))
    }
}

/// Fails when a JSON manifest does not declare every required dependency.
#[derive(Debug, Clone)]
pub struct ManifestDepsCheck {
    meta: CheckMeta,
    manifest: PathBuf,
    dependencies: Vec<String>,
    tables: Vec<String>,
}

impl ManifestDepsCheck {
    pub fn new(
        name: impl Into<String>,
        section: impl Into<String>,
        severity: Severity,
        manifest: impl Into<PathBuf>,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            meta: CheckMeta::new(name, section, severity),
            manifest: manifest.into(),
            dependencies,
            tables: vec!["dependencies".to_string()],
        }
    }

    /// Manifest objects searched for dependency names.
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }

    fn declared(&self, doc: &serde_json::Value, dep: &str) -> bool {
        self.tables.iter().any(|table| {
            doc.get(table)
                .and_then(|deps| deps.get(dep))
                .is_some_and(|spec| match spec {
                    serde_json::Value::Null => false,
                    serde_json::Value::String(s) => !s.is_empty(),
                    _ => true,
                })
        })
    }
}

impl Check for ManifestDepsCheck {
    fn meta(&self) -> &CheckMeta {
        &self.meta
    }

    fn evaluate(&self, snapshot: &Snapshot) -> Result<Evaluation, SnapshotError> {
        if !snapshot.exists(&self.manifest) {
            return Ok(Evaluation::fail(
                FailureKind::MissingData,
                format!("could not find {}", self.manifest.display()),
            ));
        }
        let doc = snapshot.read_manifest(&self.manifest)?;

        let details: Vec<Detail> = self
            .dependencies
            .iter()
            .map(|dep| {
                if self.declared(&doc, dep) {
                    Detail::pass(format!("{dep} is declared"))
                } else {
                    Detail::fail(format!("{dep} is missing"))
                }
            })
            .collect();
        let missing: Vec<&str> = self
            .dependencies
            .iter()
            .zip(&details)
            .filter(|(_, d)| d.status == CheckStatus::Fail)
            .map(|(dep, _)| dep.as_str())
            .collect();

        let evaluation = if missing.is_empty() {
            Evaluation::pass(format!(
                "{} declares all {} required dependencies",
                self.manifest.display(),
                self.dependencies.len()
            ))
        } else {
            Evaluation::fail(
                FailureKind::MissingData,
                format!("{} is missing {}", self.manifest.display(), missing.join(", ")),
            )
        };
        Ok(evaluation.with_details(details))
    }
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    pub fn literal(text: impl Into<String>) -> Self {
        Pattern::Literal(text.into())
    }

    pub fn regex(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Pattern::Regex)
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Pattern::Literal(needle) => text.contains(needle.as_str()),
            Pattern::Regex(re) => re.is_match(text),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(needle) => write!(f, "`{needle}`"),
            Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Every pattern must match the same file.
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    Present,
    Absent,
}

/// Surface-level text search over one or more files.
///
/// With `Expectation::Absent` the check fails when any inspected file
/// matches (credential leakage). With `Expectation::Present` it fails when
/// any inspected file does not match (expected markers). Directory targets
/// expand to the files below them, filtered by extension.
#[derive(Debug, Clone)]
pub struct ContentPatternCheck {
    meta: CheckMeta,
    paths: Vec<PathBuf>,
    patterns: Vec<Pattern>,
    mode: MatchMode,
    expect: Expectation,
    extensions: Vec<String>,
}

impl ContentPatternCheck {
    pub fn new(
        name: impl Into<String>,
        section: impl Into<String>,
        severity: Severity,
        paths: Vec<PathBuf>,
        patterns: Vec<Pattern>,
        mode: MatchMode,
        expect: Expectation,
    ) -> Self {
        Self {
            meta: CheckMeta::new(name, section, severity),
            paths,
            patterns,
            mode,
            expect,
            extensions: Vec::new(),
        }
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    fn matches(&self, text: &str) -> bool {
        match self.mode {
            MatchMode::All => self.patterns.iter().all(|p| p.is_match(text)),
            MatchMode::Any => self.patterns.iter().any(|p| p.is_match(text)),
        }
    }

    fn describe_patterns(&self) -> String {
        let joiner = match self.mode {
            MatchMode::All => " and ",
            MatchMode::Any => " or ",
        };
        self.patterns
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(joiner)
    }

    fn targets(&self, snapshot: &Snapshot) -> Result<(Vec<PathBuf>, Vec<PathBuf>), SnapshotError> {
        let mut files = Vec::new();
        let mut missing = Vec::new();
        for path in &self.paths {
            if !snapshot.exists(path) {
                missing.push(path.clone());
            } else if snapshot.is_dir(path) {
                files.extend(snapshot.files_under(path, &self.extensions)?);
            } else {
                files.push(path.clone());
            }
        }
        Ok((files, missing))
    }
}

impl Check for ContentPatternCheck {
    fn meta(&self) -> &CheckMeta {
        &self.meta
    }

    fn evaluate(&self, snapshot: &Snapshot) -> Result<Evaluation, SnapshotError> {
        let (files, missing) = self.targets(snapshot)?;
        if !missing.is_empty() {
            let details = missing
                .iter()
                .map(|p| Detail::fail(format!("{} missing", p.display())))
                .collect();
            return Ok(Evaluation::fail(
                FailureKind::MissingData,
                format!("cannot inspect {}", display_paths(&missing)),
            )
            .with_details(details));
        }
        if files.is_empty() && self.expect == Expectation::Present {
            return Ok(Evaluation::fail(
                FailureKind::MissingData,
                format!("no files to inspect under {}", display_paths(&self.paths)),
            ));
        }

        let mut offenders = Vec::new();
        for file in &files {
            let text = snapshot.read_text(file)?;
            let hit = self.matches(&text);
            let offending = match self.expect {
                Expectation::Absent => hit,
                Expectation::Present => !hit,
            };
            if offending {
                offenders.push(file.clone());
            }
        }

        let patterns = self.describe_patterns();
        let evaluation = match (self.expect, offenders.is_empty()) {
            (Expectation::Absent, true) => {
                Evaluation::pass(format!("no {patterns} in {} file(s)", files.len()))
            }
            (Expectation::Absent, false) => Evaluation::violation(format!(
                "{patterns} found in {}",
                display_paths(&offenders)
            )),
            (Expectation::Present, true) => {
                Evaluation::pass(format!("{patterns} found in {}", display_paths(&files)))
            }
            (Expectation::Present, false) => Evaluation::violation(format!(
                "{patterns} not found in {}",
                display_paths(&offenders)
            )),
        };
        let details = if offenders.len() > 1 {
            offenders
                .iter()
                .map(|p| Detail::fail(p.display().to_string()))
                .collect()
        } else {
            Vec::new()
        };
        Ok(evaluation.with_details(details))
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    match paths {
        [] => "0 files".to_string(),
        [one] => one.display().to_string(),
        many => format!("{} files", many.len()),
    }
}
