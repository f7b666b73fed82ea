//! Snapshot store: the guard's only persisted state.
//!
//! A snapshot is the last validated `(manifest, tracked document)` pair.
//! It is read at the start of every invocation and replaced atomically after
//! a full successful guard pass; nothing else writes it.

use crate::core::config::GuardConfig;
use crate::core::error::GuardError;
use crate::core::manifest::DigestManifest;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub manifest: DigestManifest,
    #[serde(default)]
    pub tracked_document: String,
}

/// Load the last validated snapshot.
///
/// A missing or corrupt snapshot file is "no prior snapshot": the default
/// empty value classifies the entire workspace as new on the next detect
/// pass. Corrupt state is never fatal.
pub fn load_snapshot(root: &Path, config: &GuardConfig) -> Snapshot {
    let path = config.snapshot_path(root);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => return Snapshot::default(),
    };
    serde_json::from_str(&content).unwrap_or_default()
}

/// Atomically persist a freshly validated snapshot.
///
/// Writes a temp file in the same directory and renames it over the target,
/// so a crash mid-write can never leave a half-written snapshot behind.
pub fn save_snapshot(
    root: &Path,
    config: &GuardConfig,
    manifest: &DigestManifest,
    tracked_document: &str,
) -> Result<(), GuardError> {
    let snapshot = Snapshot {
        manifest: manifest.clone(),
        tracked_document: tracked_document.to_string(),
    };
    let path = config.snapshot_path(root);
    let dir = path
        .parent()
        .ok_or_else(|| GuardError::PathError(format!("{} has no parent", path.display())))?;
    fs::create_dir_all(dir).map_err(GuardError::IoError)?;

    let rendered = serde_json::to_string_pretty(&snapshot)
        .map_err(|e| GuardError::ConfigError(e.to_string()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, rendered).map_err(GuardError::IoError)?;
    fs::rename(&tmp_path, &path).map_err(GuardError::IoError)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_missing_snapshot_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = load_snapshot(tmp.path(), &GuardConfig::default());
        assert!(snapshot.manifest.is_empty());
        assert!(snapshot.tracked_document.is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_treated_as_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let config = GuardConfig::default();
        let path = config.snapshot_path(tmp.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json at all").unwrap();
        let snapshot = load_snapshot(tmp.path(), &config);
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let config = GuardConfig::default();
        let mut manifest: DigestManifest = BTreeMap::new();
        manifest.insert("src/lib.rs".to_string(), "ab".repeat(32));
        save_snapshot(tmp.path(), &config, &manifest, "# TASKS\n").unwrap();

        let snapshot = load_snapshot(tmp.path(), &config);
        assert_eq!(snapshot.manifest, manifest);
        assert_eq!(snapshot.tracked_document, "# TASKS\n");
        // No temp file lingers after the rename.
        assert!(!config.snapshot_path(tmp.path()).with_extension("json.tmp").exists());
    }
}
