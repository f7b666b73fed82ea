//! Guard configuration loaded from `.palisade/guard.toml`.
//!
//! Every field has a default so the guard runs unconfigured; an absent or
//! empty config file is not an error.

use crate::core::error::GuardError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const GUARD_DIR: &str = ".palisade";
pub const CONFIG_FILE: &str = "guard.toml";
pub const SNAPSHOT_FILE: &str = "snapshot.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Markdown filenames (basenames) that may be added or edited freely.
    pub approved_markdown: Vec<String>,
    /// Workspace-relative path of the tracked progress document.
    pub tracked_document: String,
    /// Directory that must see changes whenever monitored work is done.
    pub test_directory: String,
    /// Heading line of the backlog section that must move on every FINISH.
    pub backlog_heading: String,
    /// Sentinel opening the progress log block in the tracked document.
    pub log_start_marker: String,
    /// Sentinel closing the progress log block.
    pub log_end_marker: String,
    /// Test runner invocation, argv[0] first.
    pub runner: Vec<String>,
    /// Substrings in runner output that mean "zero tests executed".
    pub zero_test_markers: Vec<String>,
    /// Directories never included in the digest manifest.
    pub excluded_dirs: Vec<String>,
    /// Env var set to "1" to suppress re-entrant guard runs.
    pub skip_env: String,
    /// Env var set to "developer" for a full local bypass.
    pub mode_env: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            approved_markdown: vec![
                "PRD.md".to_string(),
                "SPEC.md".to_string(),
                "TASKS.md".to_string(),
                "CURATION_CHECKLIST.md".to_string(),
                "Knowledge_Source_Organization.md".to_string(),
            ],
            tracked_document: "TASKS.md".to_string(),
            test_directory: "tests".to_string(),
            backlog_heading: "## Remediation Backlog".to_string(),
            log_start_marker: "<!-- PROGRESS LOG START -->".to_string(),
            log_end_marker: "<!-- PROGRESS LOG END -->".to_string(),
            runner: vec!["pytest".to_string(), "-q".to_string()],
            zero_test_markers: vec![
                "no tests ran".to_string(),
                "collected 0 items".to_string(),
            ],
            excluded_dirs: vec![
                ".git".to_string(),
                ".hg".to_string(),
                ".svn".to_string(),
                "target".to_string(),
                "node_modules".to_string(),
                "__pycache__".to_string(),
                ".venv".to_string(),
                GUARD_DIR.to_string(),
            ],
            skip_env: "PALISADE_GUARD_SKIP".to_string(),
            mode_env: "PALISADE_GUARD_MODE".to_string(),
        }
    }
}

impl GuardConfig {
    pub fn snapshot_path(&self, root: &Path) -> PathBuf {
        root.join(GUARD_DIR).join(SNAPSHOT_FILE)
    }

    pub fn is_approved_markdown(&self, path: &str) -> bool {
        let base = basename(path);
        self.approved_markdown.iter().any(|a| a == base)
    }

    pub fn is_markdown(path: &str) -> bool {
        path.to_ascii_lowercase().ends_with(".md")
    }

    /// A path under the designated test directory counts as test evidence.
    pub fn is_test_path(&self, path: &str) -> bool {
        let prefix = format!("{}/", self.test_directory.trim_end_matches('/'));
        path.starts_with(&prefix)
    }
}

pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Load guard config from `<root>/.palisade/guard.toml`.
///
/// No config file means defaults, not an error.
pub fn load_config(root: &Path) -> Result<GuardConfig, GuardError> {
    let config_path = root.join(GUARD_DIR).join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(GuardConfig::default());
    }
    let content = fs::read_to_string(&config_path).map_err(GuardError::IoError)?;
    let config: GuardConfig =
        toml::from_str(&content).map_err(|e| GuardError::ConfigError(e.to_string()))?;
    Ok(config)
}

/// Write a default `guard.toml`, refusing to clobber unless `force` is set.
pub fn write_default_config(root: &Path, force: bool) -> Result<PathBuf, GuardError> {
    let dir = root.join(GUARD_DIR);
    fs::create_dir_all(&dir).map_err(GuardError::IoError)?;
    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() && !force {
        return Err(GuardError::ConfigError(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }
    let rendered = toml::to_string_pretty(&GuardConfig::default())
        .map_err(|e| GuardError::ConfigError(e.to_string()))?;
    fs::write(&config_path, rendered).map_err(GuardError::IoError)?;
    Ok(config_path)
}
