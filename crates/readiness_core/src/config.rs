use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::checks::{
    Check, ContentPatternCheck, EnvVarCheck, Expectation, ManifestDepsCheck, MatchMode, Pattern,
    RequiredFilesCheck,
};
use crate::error::ConfigError;
use crate::registry::Registry;
use crate::report::Severity;

/// Name looked up under the project root when no config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "readiness.toml";

#[derive(Debug, Deserialize, Default)]
pub struct ReadinessConfig {
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub report: Option<ReportConfig>,
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
    /// When empty the built-in deployment checklist is used.
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

impl ReadinessConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&data).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(data: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    /// Loads `path` when given, otherwise `readiness.toml` under `root` if it
    /// exists, otherwise the defaults.
    pub fn discover(root: &Path, path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_path(path),
            None => {
                let candidate = root.join(DEFAULT_CONFIG_FILE);
                if candidate.is_file() {
                    Self::from_path(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn trace_filter(&self) -> Option<&str> {
        self.telemetry.as_ref().and_then(|t| t.trace_filter.as_deref())
    }

    pub fn build_registry(&self) -> Result<Registry, ConfigError> {
        if self.checks.is_empty() {
            return Ok(Registry::deployment_default());
        }

        let mut seen = HashSet::new();
        let mut registry = Registry::new();
        for cfg in &self.checks {
            if !is_valid_name(&cfg.name) {
                return Err(ConfigError::InvalidName(cfg.name.clone()));
            }
            if !seen.insert(cfg.name.as_str()) {
                return Err(ConfigError::DuplicateCheck(cfg.name.clone()));
            }
            registry.push(cfg.build()?);
        }
        Ok(registry)
    }
}

/// Names appear as `[PASS] name: message` in the text report, so they must
/// survive being split at the first `": "`.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.trim() == name && !name.contains(['\n', '\r']) && !name.contains(": ")
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Dotenv files read beneath process variables, relative to the root.
    pub env_files: Vec<PathBuf>,
    pub max_file_bytes: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            env_files: vec![PathBuf::from(".env")],
            max_file_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub trace_filter: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckConfig {
    pub name: String,
    pub section: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(flatten)]
    pub rule: RuleConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleConfig {
    EnvVar {
        var: String,
    },
    RequiredFiles {
        paths: Vec<PathBuf>,
    },
    ManifestDeps {
        manifest: PathBuf,
        dependencies: Vec<String>,
        #[serde(default = "default_dependency_tables")]
        tables: Vec<String>,
    },
    ContentPattern {
        paths: Vec<PathBuf>,
        patterns: Vec<PatternConfig>,
        #[serde(default)]
        mode: MatchMode,
        expect: Expectation,
        #[serde(default)]
        extensions: Vec<String>,
    },
}

fn default_dependency_tables() -> Vec<String> {
    vec!["dependencies".to_string()]
}

/// A bare string is a literal; `{ regex = "..." }` is a regular expression.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum PatternConfig {
    Literal(String),
    Regex { regex: String },
}

impl CheckConfig {
    fn build(&self) -> Result<Box<dyn Check>, ConfigError> {
        let name = self.name.clone();
        let section = self.section.clone();
        let severity = self.severity;
        let check: Box<dyn Check> = match &self.rule {
            RuleConfig::EnvVar { var } => {
                Box::new(EnvVarCheck::new(name, section, severity, var.clone()))
            }
            RuleConfig::RequiredFiles { paths } => {
                if paths.is_empty() {
                    return Err(ConfigError::NoPaths(name));
                }
                Box::new(RequiredFilesCheck::new(name, section, severity, paths.clone()))
            }
            RuleConfig::ManifestDeps {
                manifest,
                dependencies,
                tables,
            } => Box::new(
                ManifestDepsCheck::new(name, section, severity, manifest.clone(), dependencies.clone())
                    .with_tables(tables.clone()),
            ),
            RuleConfig::ContentPattern {
                paths,
                patterns,
                mode,
                expect,
                extensions,
            } => {
                if paths.is_empty() {
                    return Err(ConfigError::NoPaths(name));
                }
                if patterns.is_empty() {
                    return Err(ConfigError::NoPatterns(name));
                }
                let patterns = patterns
                    .iter()
                    .map(|p| match p {
                        PatternConfig::Literal(text) => Ok(Pattern::literal(text.clone())),
                        PatternConfig::Regex { regex } => {
                            Pattern::regex(regex).map_err(|source| ConfigError::Regex {
                                check: name.clone(),
                                pattern: regex.clone(),
                                source,
                            })
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Box::new(
                    ContentPatternCheck::new(name, section, severity, paths.clone(), patterns, *mode, *expect)
                        .with_extensions(extensions.clone()),
                )
            }
        };
        Ok(check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[snapshot]
env_files = [".env", ".env.production"]

[report]
path = "reports/readiness.json"

[telemetry]
trace_filter = "readiness_core=debug"

[[checks]]
name = "database-url"
section = "Environment variables"
kind = "env_var"
var = "MONGODB_URI"

[[checks]]
name = "no-secrets"
section = "Security checks"
kind = "content_pattern"
paths = ["backend"]
extensions = ["js"]
patterns = ["sk-", { regex = "AKIA[0-9A-Z]{16}" }]
mode = "any"
expect = "absent"

[[checks]]
name = "middleware"
section = "Security checks"
severity = "warning"
kind = "content_pattern"
paths = ["backend/index.js"]
patterns = ["helmet", "rateLimit"]
expect = "present"
"#;

    #[test]
    fn parses_full_config() {
        let cfg = ReadinessConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.snapshot.env_files.len(), 2);
        assert_eq!(cfg.snapshot.max_file_bytes, SnapshotConfig::default().max_file_bytes);
        assert_eq!(cfg.trace_filter(), Some("readiness_core=debug"));
        assert_eq!(cfg.checks.len(), 3);
        assert_eq!(cfg.checks[0].severity, Severity::Blocking);
        assert_eq!(cfg.checks[2].severity, Severity::Warning);

        let registry = cfg.build_registry().unwrap();
        let names: Vec<_> = registry.iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, ["database-url", "no-secrets", "middleware"]);
    }

    #[test]
    fn empty_config_uses_deployment_checklist() {
        let cfg = ReadinessConfig::from_toml_str("").unwrap();
        let registry = cfg.build_registry().unwrap();
        assert_eq!(registry.len(), Registry::deployment_default().len());
    }

    #[test]
    fn rejects_duplicate_names() {
        let cfg = ReadinessConfig::from_toml_str(
            r#"
[[checks]]
name = "a"
section = "s"
kind = "env_var"
var = "X"

[[checks]]
name = "a"
section = "s"
kind = "env_var"
var = "Y"
"#,
        )
        .unwrap();
        assert!(matches!(cfg.build_registry(), Err(ConfigError::DuplicateCheck(name)) if name == "a"));
    }

    #[test]
    fn rejects_names_that_break_the_text_report() {
        for bad in ["env: api key", " padded", "two\nlines", ""] {
            let cfg = ReadinessConfig {
                checks: vec![CheckConfig {
                    name: bad.to_string(),
                    section: "s".into(),
                    severity: Severity::Blocking,
                    rule: RuleConfig::EnvVar { var: "X".into() },
                }],
                ..ReadinessConfig::default()
            };
            assert!(
                matches!(cfg.build_registry(), Err(ConfigError::InvalidName(name)) if name == bad),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_bad_regex() {
        let cfg = ReadinessConfig::from_toml_str(
            r#"
[[checks]]
name = "bad"
section = "s"
kind = "content_pattern"
paths = ["a.js"]
patterns = [{ regex = "(" }]
expect = "absent"
"#,
        )
        .unwrap();
        assert!(matches!(cfg.build_registry(), Err(ConfigError::Regex { .. })));
    }

    #[test]
    fn discover_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ReadinessConfig::discover(dir.path(), None).unwrap();
        assert!(cfg.checks.is_empty());
        assert!(cfg.report.is_none());

        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[report]\npath = \"out.json\"\n").unwrap();
        let cfg = ReadinessConfig::discover(dir.path(), None).unwrap();
        assert_eq!(cfg.report.unwrap().path, PathBuf::from("out.json"));
    }
}
