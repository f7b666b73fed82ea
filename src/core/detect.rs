//! Change detection: VCS-backed when possible, manifest-diff otherwise.
//!
//! Both strategies answer the same question — which paths differ from the
//! last validated state — even though their mechanics differ. The strategy
//! is probed once per run; any VCS failure (not installed, not a repository,
//! transient error) degrades silently to the manifest diff.

use crate::core::config::GuardConfig;
use crate::core::error::GuardError;
use crate::core::manifest::DigestManifest;
use crate::core::snapshot::Snapshot;
use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;

/// Paths classified by one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Every path whose content differs from the last validated state.
    pub changed_paths: BTreeSet<String>,
    /// Newly-introduced markdown files that fail the approved allowlist.
    pub added_markdown: BTreeSet<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.changed_paths.is_empty() && self.added_markdown.is_empty()
    }
}

/// Detection strategy, selected once per run by a capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detector {
    Vcs,
    Manifest,
}

impl std::fmt::Display for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vcs => write!(f, "vcs"),
            Self::Manifest => write!(f, "manifest"),
        }
    }
}

/// Probe the VCS and detect changes, falling back to the manifest diff on
/// any VCS error. Returns the strategy actually used alongside the result.
pub fn detect_changes(
    root: &Path,
    config: &GuardConfig,
    current: &DigestManifest,
    snapshot: &Snapshot,
) -> (Detector, ChangeSet) {
    match vcs_status(root) {
        Ok(status) => (Detector::Vcs, classify_vcs_status(&status, config)),
        Err(_) => (
            Detector::Manifest,
            diff_manifests(&snapshot.manifest, current, config),
        ),
    }
}

/// Run `git status --porcelain -uall` and return its raw output.
/// `-uall` reports untracked files individually instead of collapsing
/// fresh directories, matching the per-file granularity of the manifest
/// diff.
fn vcs_status(root: &Path) -> Result<String, GuardError> {
    let output = Command::new("git")
        .args(["status", "--porcelain", "-uall"])
        .current_dir(root)
        .output()
        .map_err(|e| GuardError::VcsError(format!("git unavailable: {}", e)))?;
    if !output.status.success() {
        return Err(GuardError::VcsError(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Parse porcelain status lines into a ChangeSet.
///
/// Each line is a two-character status code, a space, and a path; renames
/// carry an arrow-separated source/destination pair and resolve to the
/// destination. `??` marks untracked paths. Paths under excluded
/// directories are dropped so the VCS view can never report guard-owned
/// state or build caches the manifest diff would not see.
pub fn classify_vcs_status(status: &str, config: &GuardConfig) -> ChangeSet {
    let mut set = ChangeSet::default();
    for line in status.lines() {
        if line.len() < 4 {
            continue;
        }
        let code = &line[..2];
        let raw_path = line[3..].trim();
        let path = match raw_path.split_once(" -> ") {
            Some((_, dest)) => dest,
            None => raw_path,
        };
        let path = unquote(path);
        if is_excluded(&path, config) {
            continue;
        }

        let is_addition = code == "??" || code.contains('A');
        if is_addition && GuardConfig::is_markdown(&path) && !config.is_approved_markdown(&path) {
            set.added_markdown.insert(path);
        } else {
            set.changed_paths.insert(path);
        }
    }
    set
}

// Excluded names apply at any depth, exactly as the manifest walk skips
// them; the two detectors must stay blind to the same paths.
fn is_excluded(path: &str, config: &GuardConfig) -> bool {
    path.split('/')
        .any(|component| config.excluded_dirs.iter().any(|d| d == component))
}

// Git quotes paths containing spaces or non-ASCII bytes.
fn unquote(path: &str) -> String {
    if path.len() >= 2 && path.starts_with('"') && path.ends_with('"') {
        path[1..path.len() - 1].replace("\\\"", "\"").replace("\\\\", "\\")
    } else {
        path.to_string()
    }
}

/// Diff the current manifest against the last validated one.
///
/// Added, modified, and deleted paths all count as changed; a
/// newly-appearing markdown path failing the allowlist is additionally an
/// added-markdown candidate.
pub fn diff_manifests(
    previous: &DigestManifest,
    current: &DigestManifest,
    config: &GuardConfig,
) -> ChangeSet {
    let mut set = ChangeSet::default();
    for (path, digest) in current {
        match previous.get(path) {
            Some(old) if old == digest => {}
            Some(_) => {
                set.changed_paths.insert(path.clone());
            }
            None => {
                if GuardConfig::is_markdown(path) && !config.is_approved_markdown(path) {
                    set.added_markdown.insert(path.clone());
                } else {
                    set.changed_paths.insert(path.clone());
                }
            }
        }
    }
    for path in previous.keys() {
        if !current.contains_key(path) {
            set.changed_paths.insert(path.clone());
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn manifest(entries: &[(&str, &str)]) -> DigestManifest {
        entries
            .iter()
            .map(|(p, d)| (p.to_string(), d.to_string()))
            .collect()
    }

    #[test]
    fn test_porcelain_modified_and_untracked() {
        let config = GuardConfig::default();
        let status = " M src/lib.rs\n?? NOTES.md\n?? tests/test_new.py\n";
        let set = classify_vcs_status(status, &config);
        assert!(set.changed_paths.contains("src/lib.rs"));
        assert!(set.changed_paths.contains("tests/test_new.py"));
        assert_eq!(
            set.added_markdown.iter().collect::<Vec<_>>(),
            vec!["NOTES.md"]
        );
    }

    #[test]
    fn test_porcelain_rename_resolves_to_destination() {
        let config = GuardConfig::default();
        let set = classify_vcs_status("R  old_name.py -> new_name.py\n", &config);
        assert!(set.changed_paths.contains("new_name.py"));
        assert!(!set.changed_paths.contains("old_name.py"));
    }

    #[test]
    fn test_porcelain_approved_markdown_addition_is_plain_change() {
        let config = GuardConfig::default();
        let set = classify_vcs_status("?? SPEC.md\n", &config);
        assert!(set.added_markdown.is_empty());
        assert!(set.changed_paths.contains("SPEC.md"));
    }

    #[test]
    fn test_porcelain_drops_guard_state_and_caches() {
        let config = GuardConfig::default();
        let status = "?? .palisade/snapshot.json\n?? target/debug/out\n M src/lib.rs\n";
        let set = classify_vcs_status(status, &config);
        assert_eq!(set.changed_paths.iter().collect::<Vec<_>>(), vec!["src/lib.rs"]);
    }

    #[test]
    fn test_porcelain_drops_nested_excluded_dirs() {
        let config = GuardConfig::default();
        let status = "?? src/__pycache__/app.cpython-312.pyc\n M src/app.py\n";
        let set = classify_vcs_status(status, &config);
        assert_eq!(set.changed_paths.iter().collect::<Vec<_>>(), vec!["src/app.py"]);
    }

    #[test]
    fn test_porcelain_quoted_path() {
        let config = GuardConfig::default();
        let set = classify_vcs_status(" M \"with space.py\"\n", &config);
        assert!(set.changed_paths.contains("with space.py"));
    }

    #[test]
    fn test_diff_flags_added_modified_and_deleted() {
        let config = GuardConfig::default();
        let previous = manifest(&[("keep.py", "a"), ("edit.py", "b"), ("gone.py", "c")]);
        let current = manifest(&[("keep.py", "a"), ("edit.py", "B"), ("new.py", "d")]);
        let set = diff_manifests(&previous, &current, &config);
        assert_eq!(
            set.changed_paths.iter().collect::<Vec<_>>(),
            vec!["edit.py", "gone.py", "new.py"]
        );
        assert!(set.added_markdown.is_empty());
    }

    #[test]
    fn test_diff_classifies_new_unapproved_markdown() {
        let config = GuardConfig::default();
        let previous = manifest(&[]);
        let current = manifest(&[("NOTES.md", "a"), ("SPEC.md", "b")]);
        let set = diff_manifests(&previous, &current, &config);
        assert_eq!(
            set.added_markdown.iter().collect::<Vec<_>>(),
            vec!["NOTES.md"]
        );
        // Approved markdown additions are ordinary changed paths.
        assert!(set.changed_paths.contains("SPEC.md"));
    }

    #[test]
    fn test_empty_tree_first_run_marks_everything() {
        let config = GuardConfig::default();
        let current = manifest(&[("src/lib.rs", "a"), ("TASKS.md", "b")]);
        let set = diff_manifests(&DigestManifest::new(), &current, &config);
        assert_eq!(set.changed_paths.len(), 2);
    }
}
