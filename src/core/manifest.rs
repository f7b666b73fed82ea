//! Digest manifest builder.
//!
//! Walks the workspace tree and produces a deterministic map of normalized
//! relative path → SHA-256 content digest. The manifest is the guard's sole
//! source of truth when no VCS is usable, so the digest must be
//! collision-resistant: a weak hash would let an agent revert content while
//! preserving timestamps and slip past the guard.

use crate::core::config::GuardConfig;
use crate::core::error::GuardError;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Normalized relative path (forward slashes) → 64-char lowercase hex digest.
pub type DigestManifest = BTreeMap<String, String>;

const HASH_CHUNK_BYTES: usize = 64 * 1024;

/// Build a fresh manifest of every regular file under `root` not excluded
/// by the config. Identical tree content always yields an identical manifest
/// regardless of traversal order.
pub fn compute_manifest(root: &Path, config: &GuardConfig) -> Result<DigestManifest, GuardError> {
    let mut files = Vec::new();
    collect_files(root, root, config, &mut files)?;

    // Hashing is embarrassingly parallel and the map is order-independent,
    // so fan out across the rayon pool and collect.
    let hashed: Result<Vec<(String, String)>, GuardError> = files
        .into_par_iter()
        .map(|(rel, path)| {
            let digest = hash_file(&path)?;
            Ok((rel, digest))
        })
        .collect();

    Ok(hashed?.into_iter().collect())
}

fn collect_files(
    root: &Path,
    dir: &Path,
    config: &GuardConfig,
    out: &mut Vec<(String, PathBuf)>,
) -> Result<(), GuardError> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(dir).map_err(GuardError::IoError)? {
        let entry = entry.map_err(GuardError::IoError)?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(GuardError::IoError)?;
        if file_type.is_dir() {
            let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
            if config.excluded_dirs.iter().any(|d| d == name) {
                continue;
            }
            collect_files(root, &path, config, out)?;
        } else if file_type.is_file() {
            let rel = relative_path(root, &path)?;
            out.push((rel, path));
        }
        // Symlinks are skipped: the guard hashes content it can read
        // deterministically, and links may point outside the workspace.
    }
    Ok(())
}

fn relative_path(root: &Path, path: &Path) -> Result<String, GuardError> {
    let rel = path
        .strip_prefix(root)
        .map_err(|_| GuardError::PathError(format!("{} escapes workspace root", path.display())))?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component.as_os_str().to_str() {
            Some(s) => parts.push(s),
            None => {
                return Err(GuardError::PathError(format!(
                    "non-UTF-8 path component in {}",
                    path.display()
                )));
            }
        }
    }
    Ok(parts.join("/"))
}

/// Stream file content through SHA-256 in fixed-size chunks.
pub fn hash_file(path: &Path) -> Result<String, GuardError> {
    let mut file = fs::File::open(path).map_err(GuardError::IoError)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_BYTES];
    loop {
        let n = file.read(&mut buf).map_err(GuardError::IoError)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
