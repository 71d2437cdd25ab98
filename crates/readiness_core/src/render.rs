//! Line-oriented text report.
//!
//! Layout: a title, then numbered section headers with one marked line per
//! check result and indented detail lines, then a summary banner. The
//! output depends only on the [`Verdict`], never on timing.

use std::fmt::Write as _;

use crate::report::{CheckResult, CheckStatus, OverallStatus, Severity, Verdict};

pub const TITLE: &str = "Deployment readiness check";

const BANNER_WIDTH: usize = 50;
const PASS: &str = "[PASS]";
const FAIL: &str = "[FAIL]";
const WARN: &str = "[WARN]";

fn marker(result: &CheckResult) -> &'static str {
    match (result.status, result.severity) {
        (CheckStatus::Pass, _) => PASS,
        (CheckStatus::Fail, Severity::Blocking) => FAIL,
        (CheckStatus::Fail, Severity::Warning) => WARN,
    }
}

pub fn render_text(verdict: &Verdict) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{TITLE}");

    let mut section_no = 0;
    let mut current: Option<&str> = None;
    for result in &verdict.results {
        if current != Some(result.section.as_str()) {
            section_no += 1;
            current = Some(result.section.as_str());
            let _ = writeln!(out, "\n{section_no}. {}", result.section);
        }
        let _ = writeln!(out, "   {} {}: {}", marker(result), result.name, result.message);
        for detail in &result.details {
            let bullet = match detail.status {
                CheckStatus::Pass => '+',
                CheckStatus::Fail => '-',
            };
            let _ = writeln!(out, "         {bullet} {}", detail.message);
        }
    }

    let summary = verdict.summary();
    let _ = writeln!(out, "\n{}", "=".repeat(BANNER_WIDTH));
    let _ = writeln!(
        out,
        "Summary: {} passed, {} failed, {} warnings",
        summary.passed, summary.failed, summary.warnings
    );
    match verdict.overall {
        OverallStatus::Ready if summary.warnings > 0 => {
            let _ = writeln!(out, "READY: all blocking checks passed; review the warnings above.");
        }
        OverallStatus::Ready => {
            let _ = writeln!(out, "READY: all checks passed.");
        }
        OverallStatus::NotReady => {
            let _ = writeln!(out, "NOT READY: fix the failed checks before deploying.");
        }
    }
    out
}

/// Recovers `(check name, status)` pairs from [`render_text`] output.
pub fn parse_text_report(text: &str) -> Vec<(String, CheckStatus)> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let (status, rest) = if let Some(rest) = line.strip_prefix(PASS) {
                (CheckStatus::Pass, rest)
            } else if let Some(rest) = line.strip_prefix(FAIL).or_else(|| line.strip_prefix(WARN)) {
                (CheckStatus::Fail, rest)
            } else {
                return None;
            };
            let (name, _) = rest.trim_start().split_once(": ")?;
            Some((name.to_string(), status))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReadinessConfig;
    use crate::registry::Registry;
    use crate::runner::run_checks;
    use crate::snapshot::Snapshot;

    fn sample_verdict() -> Verdict {
        let snapshot = Snapshot::builder()
            .file("backend/index.js", "app.use(helmet());")
            .file("backend/package.json", r#"{"dependencies": {"express": "^4", "cors": "^2"}}"#)
            .file("frontend/index.html", "")
            .file("frontend/public/main.js", "fetch('http://localhost:3000/api/chat')")
            .file(".gitignore", ".env")
            .build();
        run_checks(&Registry::deployment_default(), &snapshot)
    }

    #[test]
    fn renders_sections_and_summary() {
        insta::assert_snapshot!("deployment_report", render_text(&sample_verdict()));
    }

    #[test]
    fn text_round_trips_names_and_statuses() {
        let verdict = sample_verdict();
        let parsed = parse_text_report(&render_text(&verdict));
        let expected: Vec<_> = verdict
            .results
            .iter()
            .map(|r| (r.name.clone(), r.status))
            .collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn config_built_names_round_trip() {
        let cfg = ReadinessConfig::from_toml_str(
            r#"
[[checks]]
name = "env:API_KEY"
section = "Environment variables"
kind = "env_var"
var = "API_KEY"

[[checks]]
name = "markers [strict] mode"
section = "Markers"
severity = "warning"
kind = "content_pattern"
paths = ["app.js"]
patterns = ["helmet"]
expect = "present"

[[checks]]
name = "no keys"
section = "Markers"
kind = "content_pattern"
paths = ["app.js"]
patterns = ["sk-"]
expect = "absent"
"#,
        )
        .unwrap();
        let registry = cfg.build_registry().unwrap();
        let snapshot = Snapshot::builder().file("app.js", "const x = 1;").build();
        let verdict = run_checks(&registry, &snapshot);

        let parsed = parse_text_report(&render_text(&verdict));
        assert_eq!(
            parsed,
            vec![
                ("env:API_KEY".to_string(), CheckStatus::Fail),
                ("markers [strict] mode".to_string(), CheckStatus::Fail),
                ("no keys".to_string(), CheckStatus::Pass),
            ]
        );
    }

    #[test]
    fn ready_with_warnings_mentions_them() {
        let snapshot = Snapshot::builder()
            .env("OPENAI_API_KEY", "set")
            .file("backend/index.js", "")
            .file(
                "backend/package.json",
                r#"{"dependencies": {"express": "1", "cors": "1", "openai": "1", "dotenv": "1"}}"#,
            )
            .file("frontend/index.html", "")
            .file("frontend/public/main.js", "localhost:3000")
            .file("frontend/public/styles.css", "")
            .file(".gitignore", "")
            .build();
        let text = render_text(&run_checks(&Registry::deployment_default(), &snapshot));
        assert!(text.contains("   [WARN] security-middleware: `helmet` and `rateLimit` not found in backend/index.js"));
        assert!(text.ends_with("READY: all blocking checks passed; review the warnings above.\n"));
    }
}
