//! Bootstrap interceptor: the guard's mandatory entry point.
//!
//! Runs once per process startup. Re-entrancy is the central concern here:
//! the guard shells out to a test runner which may itself launch tooling
//! that would re-trigger the guard, so an explicit suppression token is
//! checked before any other logic and held via an RAII guard while the
//! pipeline runs.

use crate::core::config::{self, GuardConfig};
use crate::core::detect::{self, Detector};
use crate::core::error::GuardError;
use crate::core::manifest::{self, DigestManifest};
use crate::core::policy::{self, PolicyViolation, Verdict};
use crate::core::snapshot::{self, Snapshot};
use std::env;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// Suppression flag already set: a guard-spawned subprocess.
    SkippedSuppressed,
    /// Developer-mode bypass requested via the mode env var.
    SkippedDeveloperMode,
    /// This process is the test runner's own startup.
    SkippedOwnRunner,
    /// Workspace identical to the last validated snapshot; nothing written.
    CleanNoOp,
    /// Full pipeline pass; a fresh snapshot was persisted.
    Allowed(Detector),
    /// Pipeline denial; the snapshot is left untouched.
    Denied(PolicyViolation),
}

/// Sets the suppression env var for the duration of a scope and restores
/// its prior state on drop, including during unwinding. A crashed guard run
/// must never permanently disable the guard for the rest of the process
/// tree.
pub struct SuppressionGuard {
    name: String,
    prior: Option<String>,
}

impl SuppressionGuard {
    pub fn engage(name: &str) -> Self {
        let prior = env::var(name).ok();
        // The guard runs single-threaded at process startup, before any
        // other thread could be reading the environment.
        unsafe { env::set_var(name, "1") };
        Self {
            name: name.to_string(),
            prior,
        }
    }
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        match &self.prior {
            Some(value) => unsafe { env::set_var(&self.name, value) },
            None => unsafe { env::remove_var(&self.name) },
        }
    }
}

fn developer_mode_enabled(config: &GuardConfig) -> bool {
    env::var(&config.mode_env)
        .map(|v| v.trim().eq_ignore_ascii_case("developer"))
        .unwrap_or(false)
}

fn suppressed(config: &GuardConfig) -> bool {
    env::var(&config.skip_env).map(|v| v == "1").unwrap_or(false)
}

/// True when the invocation is the test runner's own startup, which must
/// not be gated by the verification step it exists to serve.
///
/// Basenames are compared exactly: a substring match would let a runner
/// like `sh` bypass enforcement from inside `/bin/bash`.
fn is_own_runner(config: &GuardConfig, argv: &[String]) -> bool {
    let Some(runner) = config.runner.first() else {
        return false;
    };
    let runner_name = config::basename(runner);
    argv.iter()
        .take(2)
        .any(|arg| config::basename(arg) == runner_name)
}

fn read_tracked_document(root: &Path, config: &GuardConfig) -> String {
    fs::read_to_string(root.join(&config.tracked_document)).unwrap_or_default()
}

/// Run the full guard lifecycle for one process startup.
pub fn enforce(root: &Path) -> Result<BootstrapOutcome, GuardError> {
    let config = config::load_config(root)?;
    let argv: Vec<String> = env::args().collect();
    enforce_with(root, &config, &argv)
}

/// Lifecycle with explicit config and argv, the seam the tests drive.
pub fn enforce_with(
    root: &Path,
    config: &GuardConfig,
    argv: &[String],
) -> Result<BootstrapOutcome, GuardError> {
    if suppressed(config) {
        return Ok(BootstrapOutcome::SkippedSuppressed);
    }
    if developer_mode_enabled(config) {
        return Ok(BootstrapOutcome::SkippedDeveloperMode);
    }
    if is_own_runner(config, argv) {
        return Ok(BootstrapOutcome::SkippedOwnRunner);
    }

    let prior = snapshot::load_snapshot(root, config);
    let current_manifest = manifest::compute_manifest(root, config)?;
    let current_document = read_tracked_document(root, config);

    if workspace_unchanged(&prior, &current_manifest, &current_document) {
        return Ok(BootstrapOutcome::CleanNoOp);
    }

    let _suppression = SuppressionGuard::engage(&config.skip_env);

    let (detector, changes) = detect::detect_changes(root, config, &current_manifest, &prior);
    match policy::run_pipeline(root, config, &changes, &prior, &current_document) {
        Verdict::Allow => {
            snapshot::save_snapshot(root, config, &current_manifest, &current_document)?;
            Ok(BootstrapOutcome::Allowed(detector))
        }
        Verdict::Deny(violation) => Ok(BootstrapOutcome::Denied(violation)),
    }
}

fn workspace_unchanged(prior: &Snapshot, manifest: &DigestManifest, document: &str) -> bool {
    prior.manifest == *manifest && prior.tracked_document == document
}
