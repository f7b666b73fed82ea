//! The ordered policy-gate pipeline.
//!
//! Gates run strictly in sequence and short-circuit on the first violation:
//! each gate's precondition is the previous gate's success, and no gate
//! mutates shared state beyond producing its verdict. Two terminal states
//! exist, allow and deny.

use crate::core::config::GuardConfig;
use crate::core::detect::ChangeSet;
use crate::core::evidence::{self, TestVerdict};
use crate::core::progress::{self, Action};
use crate::core::snapshot::Snapshot;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationCode {
    DisallowedDoc,
    MissingProgressLogUpdate,
    NoProgressEntries,
    IncompleteStartFinishPair,
    MalformedEntry,
    CheckboxNotUpdated,
    MissingTestChanges,
    TestsFailed,
    NoTestsExecuted,
    BacklogNotUpdated,
}

impl std::fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Self::DisallowedDoc => "disallowed-doc",
            Self::MissingProgressLogUpdate => "missing-progress-log-update",
            Self::NoProgressEntries => "no-progress-entries",
            Self::IncompleteStartFinishPair => "incomplete-start-finish-pair",
            Self::MalformedEntry => "malformed-entry",
            Self::CheckboxNotUpdated => "checkbox-not-updated",
            Self::MissingTestChanges => "missing-test-changes",
            Self::TestsFailed => "tests-failed",
            Self::NoTestsExecuted => "no-tests-executed",
            Self::BacklogNotUpdated => "backlog-not-updated",
        };
        write!(f, "{}", code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyViolation {
    pub code: ViolationCode,
    pub message: String,
    pub detail: Vec<String>,
}

impl PolicyViolation {
    fn new(code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: Vec::new(),
        }
    }

    fn with_detail(code: ViolationCode, message: impl Into<String>, detail: Vec<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(PolicyViolation),
}

/// Changed paths that are not pure approved-documentation edits.
pub fn monitored_changes(changes: &ChangeSet, config: &GuardConfig) -> BTreeSet<String> {
    changes
        .changed_paths
        .iter()
        .filter(|path| !(GuardConfig::is_markdown(path) && config.is_approved_markdown(path)))
        .cloned()
        .collect()
}

/// Run every gate in order against one detection pass.
///
/// `current_document` is the tracked document's present text; the snapshot
/// supplies the last validated text for the log and backlog diffs.
pub fn run_pipeline(
    root: &Path,
    config: &GuardConfig,
    changes: &ChangeSet,
    snapshot: &Snapshot,
    current_document: &str,
) -> Verdict {
    // Gate 1: documentation allowlist. The detector only classifies
    // markdown failing the allowlist into this set.
    if !changes.added_markdown.is_empty() {
        return Verdict::Deny(PolicyViolation::with_detail(
            ViolationCode::DisallowedDoc,
            format!(
                "new documentation files are not allowed; use the approved set ({})",
                config.approved_markdown.join(", ")
            ),
            changes.added_markdown.iter().cloned().collect(),
        ));
    }

    // Gate 2: pure documentation edits need no further process.
    let monitored = monitored_changes(changes, config);
    if monitored.is_empty() {
        return Verdict::Allow;
    }

    // Gate 3: monitored work must touch the tracked document.
    if !changes.changed_paths.contains(&config.tracked_document) {
        return Verdict::Deny(PolicyViolation::new(
            ViolationCode::MissingProgressLogUpdate,
            format!(
                "{} must be updated with progress log entries whenever work is done",
                config.tracked_document
            ),
        ));
    }

    // Gate 4: entry discovery inside the marked log region.
    let added = progress::added_log_lines(&snapshot.tracked_document, current_document, config);
    let candidates: Vec<&String> = added
        .iter()
        .filter(|line| progress::is_entry_candidate(line))
        .collect();
    if candidates.is_empty() {
        return Verdict::Deny(PolicyViolation::new(
            ViolationCode::NoProgressEntries,
            "tracked document changed but no START/FINISH entries were added to the progress log",
        ));
    }
    let has_start = candidates.iter().any(|l| l.starts_with("[START"));
    let has_finish = candidates.iter().any(|l| l.starts_with("[FINISH"));
    if !has_start || !has_finish {
        return Verdict::Deny(PolicyViolation::new(
            ViolationCode::IncompleteStartFinishPair,
            "progress log requires BOTH a [START …] and a [FINISH …] entry for this change",
        ));
    }

    // Gate 5: entry grammar.
    let mut entries = Vec::new();
    let mut malformed = Vec::new();
    for line in &candidates {
        match progress::parse_entry(line) {
            Some(entry) => entries.push(entry),
            None => malformed.push((*line).clone()),
        }
    }
    if !malformed.is_empty() {
        return Verdict::Deny(PolicyViolation::with_detail(
            ViolationCode::MalformedEntry,
            "progress entries must match '[START YYYY-MM-DDThh:mmZ] TASK-ID - summary'",
            malformed,
        ));
    }

    // Gate 6: every FINISH needs a completed checklist line for its task id.
    let unchecked: Vec<String> = entries
        .iter()
        .filter(|e| e.action == Action::Finish)
        .map(|e| e.task_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|id| !progress::has_completed_checkbox(current_document, id))
        .collect();
    if !unchecked.is_empty() {
        return Verdict::Deny(PolicyViolation::with_detail(
            ViolationCode::CheckboxNotUpdated,
            "FINISH logged but checklist boxes are not marked [x]",
            unchecked,
        ));
    }

    // Gate 7: at least one changed path under the test directory.
    if !changes.changed_paths.iter().any(|p| config.is_test_path(p)) {
        return Verdict::Deny(PolicyViolation::new(
            ViolationCode::MissingTestChanges,
            format!(
                "no changes under {}/ accompany this work",
                config.test_directory
            ),
        ));
    }

    // Gate 8: automated verification via the external runner.
    match evidence::run_test_evidence(root, config) {
        TestVerdict::Passed => {}
        TestVerdict::Failed(detail) => {
            return Verdict::Deny(PolicyViolation::with_detail(
                ViolationCode::TestsFailed,
                "automated test run failed",
                vec![detail],
            ));
        }
        TestVerdict::NothingExecuted(detail) => {
            return Verdict::Deny(PolicyViolation::with_detail(
                ViolationCode::NoTestsExecuted,
                "test runner exited cleanly but executed zero tests",
                vec![detail],
            ));
        }
    }

    // Gate 9: the backlog section must move whenever work finishes.
    let previous_backlog = progress::backlog_section(&snapshot.tracked_document, config);
    let current_backlog = progress::backlog_section(current_document, config);
    if previous_backlog == current_backlog {
        return Verdict::Deny(PolicyViolation::new(
            ViolationCode::BacklogNotUpdated,
            format!(
                "the '{}' section is byte-identical to the last validated state",
                config.backlog_heading
            ),
        ));
    }

    Verdict::Allow
}
