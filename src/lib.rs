//! Palisade: a workspace compliance guard.
//!
//! **Palisade is the policy engine that makes undocumented work impossible
//! to land.** It intercepts workspace mutations at tool startup and refuses
//! to proceed until substantive changes are accompanied by progress log
//! entries, checked-off task boxes, a moving backlog, and a passing
//! automated test run — whether or not a version-control system is present.
//!
//! # For AI Agents
//!
//! **You MUST:**
//! 1. Log `[START …]` and `[FINISH …]` entries in the tracked document's
//!    progress block for every piece of monitored work
//! 2. Flip the checklist box for every task id you FINISH
//! 3. Touch the backlog section whenever work completes
//! 4. Ship changes under the test directory and keep the suite green
//! 5. Never set the suppression flag yourself: it belongs to the guard
//!
//! # Architecture
//!
//! - **Digest manifest**: deterministic path → SHA-256 map of the tree
//! - **Snapshot store**: the last validated `(manifest, document)` pair,
//!   the guard's only durable state, written atomically on success
//! - **Change detector**: `git status --porcelain` when usable, manifest
//!   diff otherwise; both answer "what differs from the last validated
//!   state"
//! - **Policy pipeline**: nine ordered short-circuiting gates
//! - **Bootstrap interceptor**: re-entrancy suppression, developer-mode
//!   bypass, idempotent no-op on a clean tree
//!
//! # Examples
//!
//! ```bash
//! # Scaffold .palisade/guard.toml
//! palisade init
//!
//! # Enforce (also the bare default invocation)
//! palisade check
//!
//! # Inspect what the guard sees without enforcing
//! palisade status
//! ```

pub mod core;

mod cli;

use crate::cli::{CheckCli, Cli, Command};
use crate::core::bootstrap::{self, BootstrapOutcome};
use crate::core::config;
use crate::core::detect;
use crate::core::error::GuardError;
use crate::core::manifest;
use crate::core::output;
use crate::core::policy::{self, PolicyViolation};
use crate::core::snapshot;

use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

/// Parse argv and run one guard command, returning the process exit code:
/// 0 = allowed/no-op, 1 = denied, 2 = guard failure.
pub fn run() -> i32 {
    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "❌ guard error:".bright_red().bold(), e);
            2
        }
    }
}

fn workspace_root(cli: &CheckCli) -> Result<PathBuf, GuardError> {
    let raw = match &cli.root {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(GuardError::IoError)?,
    };
    std::fs::canonicalize(&raw).map_err(GuardError::IoError)
}

fn dispatch(cli: Cli) -> Result<i32, GuardError> {
    match cli.command.unwrap_or(Command::Check(CheckCli { root: None })) {
        Command::Check(check) => {
            let root = workspace_root(&check)?;
            let outcome = bootstrap::enforce(&root)?;
            Ok(report_outcome(&outcome))
        }
        Command::Status(check) => {
            let root = workspace_root(&check)?;
            print_status(&root)?;
            Ok(0)
        }
        Command::Init { dir, force } => {
            let raw = match dir {
                Some(d) => d,
                None => std::env::current_dir().map_err(GuardError::IoError)?,
            };
            let root = std::fs::canonicalize(&raw).map_err(GuardError::IoError)?;
            let path = config::write_default_config(&root, force)?;
            println!("{} wrote {}", "✅".bright_green(), path.display());
            Ok(0)
        }
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}

fn report_outcome(outcome: &BootstrapOutcome) -> i32 {
    match outcome {
        BootstrapOutcome::SkippedSuppressed
        | BootstrapOutcome::SkippedDeveloperMode
        | BootstrapOutcome::SkippedOwnRunner
        | BootstrapOutcome::CleanNoOp => 0,
        BootstrapOutcome::Allowed(detector) => {
            println!(
                "{} workspace validated ({} detector); snapshot refreshed",
                "✅".bright_green(),
                detector
            );
            0
        }
        BootstrapOutcome::Denied(violation) => {
            report_violation(violation);
            1
        }
    }
}

fn report_violation(violation: &PolicyViolation) {
    eprintln!(
        "{} {} {}",
        "❌".bright_red(),
        format!("[{}]", violation.code).bright_red().bold(),
        violation.message
    );
    for item in &violation.detail {
        eprintln!("  - {}", output::compact_line(item, 200));
    }
}

fn print_status(root: &PathBuf) -> Result<(), GuardError> {
    let config = config::load_config(root)?;
    let prior = snapshot::load_snapshot(root, &config);
    let current = manifest::compute_manifest(root, &config)?;
    let (detector, changes) = detect::detect_changes(root, &config, &current, &prior);
    let monitored = policy::monitored_changes(&changes, &config);

    println!("detector: {}", detector);
    println!("tracked document: {}", config.tracked_document);
    if changes.is_empty() {
        println!("{} workspace clean", "✅".bright_green());
        return Ok(());
    }
    println!("changed paths ({}):", changes.changed_paths.len());
    for path in &changes.changed_paths {
        let marker = if monitored.contains(path) {
            "monitored".bright_yellow()
        } else {
            "doc-only".bright_black()
        };
        println!("  {} {}", marker, path);
    }
    if !changes.added_markdown.is_empty() {
        println!("disallowed new markdown ({}):", changes.added_markdown.len());
        for path in &changes.added_markdown {
            println!("  {} {}", "✗".bright_red(), path);
        }
    }
    Ok(())
}
