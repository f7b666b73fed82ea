//! Progress log parsing for the tracked document.
//!
//! The tracked document is opaque prose to the guard except for three
//! structured regions: the demarcated progress log block, checklist lines,
//! and the named backlog section. Newly-appended log lines are recovered by
//! set-difference (with multiplicity) against the snapshot's prior document
//! text — the snapshot is the guard's definition of "last validated state",
//! which makes this mechanism identical under both detection strategies.

use crate::core::config::GuardConfig;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Finish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEntry {
    pub action: Action,
    /// ISO-8601 to the minute, trailing `Z` (e.g. `2025-10-15T08:55Z`).
    pub timestamp_utc: String,
    pub task_id: String,
    pub summary: String,
}

fn entry_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Summary separator is an en-dash or plain hyphen.
    RE.get_or_init(|| {
        Regex::new(r"^\[(START|FINISH) (\d{4}-\d{2}-\d{2}T\d{2}:\d{2}Z)\] (\S+) [-–] (.+)$")
            .unwrap()
    })
}

/// A line that claims to be a progress entry, whether or not it parses.
pub fn is_entry_candidate(line: &str) -> bool {
    line.starts_with("[START") || line.starts_with("[FINISH")
}

/// Parse one log line against the fixed entry grammar.
pub fn parse_entry(line: &str) -> Option<ProgressEntry> {
    let caps = entry_regex().captures(line)?;
    let action = match &caps[1] {
        "START" => Action::Start,
        _ => Action::Finish,
    };
    Some(ProgressEntry {
        action,
        timestamp_utc: caps[2].to_string(),
        task_id: caps[3].to_string(),
        summary: caps[4].to_string(),
    })
}

/// Extract the lines between the log sentinels, trimmed, empties dropped.
pub fn log_region_lines(document: &str, config: &GuardConfig) -> Vec<String> {
    let mut inside = false;
    let mut lines = Vec::new();
    for line in document.lines() {
        let trimmed = line.trim();
        if trimmed == config.log_start_marker {
            inside = true;
            continue;
        }
        if trimmed == config.log_end_marker {
            inside = false;
            continue;
        }
        if inside && !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }
    lines
}

/// Lines present in the current log region but not in the prior one,
/// counted with multiplicity so a repeated entry still registers as new.
pub fn added_log_lines(previous: &str, current: &str, config: &GuardConfig) -> Vec<String> {
    let mut prior_counts: HashMap<String, usize> = HashMap::new();
    for line in log_region_lines(previous, config) {
        *prior_counts.entry(line).or_insert(0) += 1;
    }

    let mut added = Vec::new();
    for line in log_region_lines(current, config) {
        match prior_counts.get_mut(&line) {
            Some(count) if *count > 0 => *count -= 1,
            _ => added.push(line),
        }
    }
    added
}

/// True when the document carries a completed checklist line for `task_id`.
///
/// Matching is exact-token: the id must be followed by a non-id character
/// (or end of line), so `T1` can never satisfy a FINISH for `T1.02`.
pub fn has_completed_checkbox(document: &str, task_id: &str) -> bool {
    let pattern = format!(
        r"(?im)^\s*[-*]\s*\[x\]\s*\*{{0,2}}{}\*{{0,2}}(?:$|[^0-9A-Za-z._-])",
        regex::escape(task_id)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return false,
    };
    re.is_match(document)
}

/// Extract the named backlog section: from the configured heading line to
/// the next heading of the same or higher level, or end of document.
pub fn backlog_section(document: &str, config: &GuardConfig) -> Option<String> {
    let heading = config.backlog_heading.trim();
    let level = heading.chars().take_while(|c| *c == '#').count().max(1);

    let mut collected: Option<Vec<&str>> = None;
    for line in document.lines() {
        match &mut collected {
            None => {
                if line.trim() == heading {
                    collected = Some(vec![line]);
                }
            }
            Some(lines) => {
                let trimmed = line.trim_start();
                let line_level = trimmed.chars().take_while(|c| *c == '#').count();
                if line_level > 0 && line_level <= level {
                    break;
                }
                lines.push(line);
            }
        }
    }
    collected.map(|lines| lines.join("\n"))
}
