//! Test evidence verification via the external runner subprocess.
//!
//! The runner's contract is exit-code plus output: exit 0 means the suite
//! passed, but output that indicates zero executed tests is still a failure.
//! A missing or crashing runner surfaces as a verdict, never as a guard
//! crash.

use crate::core::config::GuardConfig;
use crate::core::output;
use std::path::Path;
use std::process::Command;

const OUTPUT_TAIL_LINES: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestVerdict {
    Passed,
    /// Runner exited non-zero, crashed, or could not be launched.
    Failed(String),
    /// Runner exited zero but its output matched a zero-tests marker.
    NothingExecuted(String),
}

/// Invoke the configured runner with the suppression flag set in its
/// environment so the child cannot re-trigger the guard.
pub fn run_test_evidence(root: &Path, config: &GuardConfig) -> TestVerdict {
    let Some((program, args)) = config.runner.split_first() else {
        return TestVerdict::Failed("no test runner configured".to_string());
    };

    let output = match Command::new(program)
        .args(args)
        .current_dir(root)
        .env(&config.skip_env, "1")
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            return TestVerdict::Failed(format!("failed to launch {}: {}", program, e));
        }
    };

    let combined = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    if !output.status.success() {
        return TestVerdict::Failed(output::tail_lines(&combined, OUTPUT_TAIL_LINES));
    }

    let lowered = combined.to_ascii_lowercase();
    for marker in &config.zero_test_markers {
        if lowered.contains(&marker.to_ascii_lowercase()) {
            return TestVerdict::NothingExecuted(output::tail_lines(&combined, OUTPUT_TAIL_LINES));
        }
    }

    TestVerdict::Passed
}
