use std::path::PathBuf;

use crate::checks::{
    Check, ContentPatternCheck, EnvVarCheck, Expectation, ManifestDepsCheck, MatchMode, Pattern,
    RequiredFilesCheck,
};
use crate::report::Severity;

/// Ordered, fixed list of checks for a run.
#[derive(Default)]
pub struct Registry {
    checks: Vec<Box<dyn Check>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, check: Box<dyn Check>) {
        self.checks.push(check);
    }

    pub fn with(mut self, check: impl Check + 'static) -> Self {
        self.push(Box::new(check));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Check> {
        self.checks.iter().map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// The pre-deployment checklist for the chat backend and static
    /// frontend.
    pub fn deployment_default() -> Self {
        Registry::new()
            .with(EnvVarCheck::new(
                "openai-api-key",
                "Environment variables",
                Severity::Blocking,
                "OPENAI_API_KEY",
            ))
            .with(RequiredFilesCheck::new(
                "required-files",
                "Required files",
                Severity::Blocking,
                [
                    "backend/index.js",
                    "backend/package.json",
                    "frontend/index.html",
                    "frontend/public/main.js",
                    "frontend/public/styles.css",
                    ".gitignore",
                ]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            ))
            .with(ManifestDepsCheck::new(
                "backend-dependencies",
                "Backend dependencies",
                Severity::Blocking,
                "backend/package.json",
                ["express", "cors", "openai", "dotenv"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            ))
            .with(ContentPatternCheck::new(
                "hardcoded-api-key",
                "Security checks",
                Severity::Blocking,
                vec![PathBuf::from("backend/index.js")],
                vec![Pattern::literal("sk-")],
                MatchMode::All,
                Expectation::Absent,
            ))
            .with(ContentPatternCheck::new(
                "security-middleware",
                "Security checks",
                Severity::Warning,
                vec![PathBuf::from("backend/index.js")],
                vec![Pattern::literal("helmet"), Pattern::literal("rateLimit")],
                MatchMode::All,
                Expectation::Present,
            ))
            .with(ContentPatternCheck::new(
                "frontend-backend-url",
                "Frontend connectivity",
                Severity::Warning,
                vec![PathBuf::from("frontend/public/main.js")],
                vec![Pattern::literal("localhost:3000")],
                MatchMode::All,
                Expectation::Present,
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_checklist_order_and_severities() {
        let registry = Registry::deployment_default();
        let summary: Vec<_> = registry
            .iter()
            .map(|c| (c.name().to_string(), c.section().to_string(), c.severity()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("openai-api-key".into(), "Environment variables".into(), Severity::Blocking),
                ("required-files".into(), "Required files".into(), Severity::Blocking),
                ("backend-dependencies".into(), "Backend dependencies".into(), Severity::Blocking),
                ("hardcoded-api-key".into(), "Security checks".into(), Severity::Blocking),
                ("security-middleware".into(), "Security checks".into(), Severity::Warning),
                ("frontend-backend-url".into(), "Frontend connectivity".into(), Severity::Warning),
            ]
        );
    }
}
