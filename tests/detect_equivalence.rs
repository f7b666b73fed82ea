//! The portability property: for the same sequence of file mutations, the
//! VCS-backed detector and the manifest-diff fallback must classify the
//! same paths the same way.

use palisade::core::config::GuardConfig;
use palisade::core::detect::{self, ChangeSet, Detector};
use palisade::core::manifest;
use palisade::core::snapshot::Snapshot;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) {
    let out = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .expect("run git");
    assert!(
        out.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Init a repo, commit the given files, and capture the snapshot manifest
/// at that same moment so both detectors share one baseline.
fn setup(files: &[(&str, &str)]) -> (TempDir, GuardConfig, Snapshot) {
    let tmp = TempDir::new().unwrap();
    let config = GuardConfig::default();
    for (rel, content) in files {
        write(tmp.path(), rel, content);
    }
    git(tmp.path(), &["init", "-b", "main"]);
    git(tmp.path(), &["config", "user.name", "Test User"]);
    git(tmp.path(), &["config", "user.email", "test@example.com"]);
    git(tmp.path(), &["add", "."]);
    git(tmp.path(), &["commit", "-m", "baseline"]);

    let baseline = manifest::compute_manifest(tmp.path(), &config).unwrap();
    let snapshot = Snapshot {
        manifest: baseline,
        tracked_document: String::new(),
    };
    (tmp, config, snapshot)
}

fn both_classifications(root: &Path, config: &GuardConfig, snapshot: &Snapshot) -> (ChangeSet, ChangeSet) {
    let current = manifest::compute_manifest(root, config).unwrap();

    let (detector, vcs_set) = detect::detect_changes(root, config, &current, snapshot);
    assert_eq!(detector, Detector::Vcs, "repo should probe as VCS-backed");

    let fallback_set = detect::diff_manifests(&snapshot.manifest, &current, config);
    (vcs_set, fallback_set)
}

#[test]
fn modify_add_delete_classify_identically() {
    let (tmp, config, snapshot) = setup(&[
        ("src/app.py", "v1\n"),
        ("src/util.py", "u1\n"),
        ("TASKS.md", "# Tasks\n"),
    ]);

    write(tmp.path(), "src/app.py", "v2\n");
    write(tmp.path(), "tests/test_app.py", "t1\n");
    write(tmp.path(), "NOTES.md", "scratch\n");
    fs::remove_file(tmp.path().join("src/util.py")).unwrap();

    let (vcs, fallback) = both_classifications(tmp.path(), &config, &snapshot);
    assert_eq!(vcs, fallback);
    assert!(vcs.changed_paths.contains("src/app.py"));
    assert!(vcs.changed_paths.contains("src/util.py"));
    assert!(vcs.changed_paths.contains("tests/test_app.py"));
    assert!(vcs.added_markdown.contains("NOTES.md"));
}

#[test]
fn nested_excluded_dirs_are_invisible_to_both() {
    let (tmp, config, snapshot) = setup(&[("src/app.py", "v1\n")]);

    // Cache churn in a nested excluded directory, untracked and not
    // gitignored, must not register as a change under either strategy.
    write(
        tmp.path(),
        "src/__pycache__/app.cpython-312.pyc",
        "bytecode\n",
    );

    let (vcs, fallback) = both_classifications(tmp.path(), &config, &snapshot);
    assert_eq!(vcs, fallback);
    assert!(vcs.is_empty());
}

#[test]
fn clean_tree_classifies_as_empty_in_both() {
    let (tmp, config, snapshot) = setup(&[("src/app.py", "v1\n")]);
    let (vcs, fallback) = both_classifications(tmp.path(), &config, &snapshot);
    assert!(vcs.is_empty());
    assert!(fallback.is_empty());
}

#[test]
fn approved_markdown_addition_classifies_identically() {
    let (tmp, config, snapshot) = setup(&[("src/app.py", "v1\n")]);
    write(tmp.path(), "SPEC.md", "# Spec\n");

    let (vcs, fallback) = both_classifications(tmp.path(), &config, &snapshot);
    assert_eq!(vcs, fallback);
    assert!(vcs.added_markdown.is_empty());
    assert!(vcs.changed_paths.contains("SPEC.md"));
}

// Tiny deterministic LCG so the property run is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

#[test]
fn random_mutation_sequences_classify_identically() {
    let seed_files: Vec<(String, String)> = (0..8)
        .map(|i| (format!("src/mod_{}.py", i), format!("body {}\n", i)))
        .collect();
    let seeded: Vec<(&str, &str)> = seed_files
        .iter()
        .map(|(p, c)| (p.as_str(), c.as_str()))
        .collect();
    let (tmp, config, snapshot) = setup(&seeded);

    let mut rng = Lcg(0x5eed_cafe);
    for step in 0..24 {
        match rng.next() % 3 {
            0 => {
                let idx = (rng.next() % 8) as usize;
                write(
                    tmp.path(),
                    &format!("src/mod_{}.py", idx),
                    &format!("mutated at step {}\n", step),
                );
            }
            1 => {
                write(
                    tmp.path(),
                    &format!("src/new_{}.py", step),
                    &format!("fresh {}\n", step),
                );
            }
            _ => {
                let idx = (rng.next() % 8) as usize;
                let path = tmp.path().join(format!("src/mod_{}.py", idx));
                if path.exists() {
                    fs::remove_file(path).unwrap();
                }
            }
        }

        let (vcs, fallback) = both_classifications(tmp.path(), &config, &snapshot);
        assert_eq!(vcs, fallback, "divergence after mutation step {}", step);
    }
}
