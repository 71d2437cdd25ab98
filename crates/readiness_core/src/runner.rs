use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Once;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::checks::{Check, Evaluation};
use crate::config::ReadinessConfig;
use crate::error::SnapshotError;
use crate::report::{CheckResult, CheckStatus, FailureKind, ReadinessReport, Severity, Verdict};
use crate::registry::Registry;
use crate::snapshot::Snapshot;

pub struct ValidationOptions {
    pub workspace_root: PathBuf,
    pub run_id: String,
}

impl ValidationOptions {
    pub fn new(workspace_root: PathBuf, run_id: impl Into<String>) -> Self {
        Self {
            workspace_root,
            run_id: run_id.into(),
        }
    }
}

/// Captures a snapshot of `options.workspace_root`, runs the configured
/// registry against it and wraps the verdict in a report.
///
/// Only an unreadable root or an invalid check definition fails here; every
/// per-check problem lands in the verdict.
pub fn run_validations(config: &ReadinessConfig, options: &ValidationOptions) -> Result<ReadinessReport> {
    let registry = config.build_registry().context("invalid check definitions")?;
    let snapshot = Snapshot::capture(&options.workspace_root, &config.snapshot)?;
    let verdict = run_checks(&registry, &snapshot);
    Ok(ReadinessReport::new(
        options.run_id.clone(),
        options.workspace_root.clone(),
        verdict,
    ))
}

/// Evaluates every check in registry order, never stopping early.
pub fn run_checks(registry: &Registry, snapshot: &Snapshot) -> Verdict {
    let results: Vec<CheckResult> = registry.iter().map(|check| run_one(check, snapshot)).collect();
    let verdict = Verdict::from_results(results);
    let summary = verdict.summary();
    info!(
        overall = ?verdict.overall,
        passed = summary.passed,
        failed = summary.failed,
        warnings = summary.warnings,
        "readiness run finished"
    );
    verdict
}

thread_local! {
    static IN_CHECK: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Wraps the current panic hook so panics raised while a check evaluates
/// on this thread are reported only through the `error!` event.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !IN_CHECK.with(Cell::get) {
                previous(info);
            }
        }));
    });
}

fn evaluate_isolated(check: &dyn Check, snapshot: &Snapshot) -> std::thread::Result<Result<Evaluation, SnapshotError>> {
    install_quiet_hook();
    IN_CHECK.with(|flag| flag.set(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| check.evaluate(snapshot)));
    IN_CHECK.with(|flag| flag.set(false));
    outcome
}

fn run_one(check: &dyn Check, snapshot: &Snapshot) -> CheckResult {
    debug!(check = check.name(), "evaluating");
    let outcome = evaluate_isolated(check, snapshot);
    match outcome {
        Ok(Ok(evaluation)) => into_result(check, evaluation),
        Ok(Err(err)) => {
            warn!(check = check.name(), error = %err, "check could not read its inputs");
            let kind = match err {
                SnapshotError::Parse { .. } => FailureKind::Parse,
                _ => FailureKind::Io,
            };
            into_result(check, Evaluation::fail(kind, error_chain(&err)))
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(check = check.name(), reason = %reason, "internal error: check crashed");
            CheckResult {
                name: check.name().to_string(),
                section: check.section().to_string(),
                status: CheckStatus::Fail,
                severity: Severity::Blocking,
                message: format!("internal error in check `{}`: {reason}", check.name()),
                failure: Some(FailureKind::CheckCrash),
                details: Vec::new(),
            }
        }
    }
}

fn into_result(check: &dyn Check, evaluation: Evaluation) -> CheckResult {
    CheckResult {
        name: check.name().to_string(),
        section: check.section().to_string(),
        status: evaluation.status,
        severity: check.severity(),
        message: evaluation.message,
        failure: evaluation.failure,
        details: evaluation.details,
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
