//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use thiserror::Error;
use walkdir::WalkDir;

/// Refusal to delete a path outside the build root.
#[derive(Debug, Error, miette::Diagnostic)]
#[error("refusing to remove {path}: it is not inside the build root {root}")]
#[diagnostic(code(quay::fs::safety_violation))]
pub struct SafetyViolation {
    pub path: PathBuf,
    pub root: PathBuf,
}

/// Copy one file, creating parent directories. Symlinks are followed.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    fs::copy(src, dst).with_context(|| {
        format!("failed to copy {} to {}", src.display(), dst.display())
    })?;
    Ok(())
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Remove `path` only if its canonical form lies under the canonical `root`.
///
/// Nothing is removed when the check fails. A missing path is not an error.
pub fn cautious_remove_dir(path: &Path, root: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let canonical_root = root
        .canonicalize()
        .with_context(|| format!("failed to resolve build root: {}", root.display()))?;
    let canonical_path = path
        .canonicalize()
        .with_context(|| format!("failed to resolve path: {}", path.display()))?;

    if canonical_path == canonical_root || !canonical_path.starts_with(&canonical_root) {
        return Err(SafetyViolation {
            path: canonical_path,
            root: canonical_root,
        }
        .into());
    }

    tracing::debug!("removing {}", canonical_path.display());
    remove_dir_all_if_exists(&canonical_path)
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Replace `path` with a fresh empty directory.
pub fn recreate_dir(path: &Path) -> Result<()> {
    remove_dir_all_if_exists(path)?;
    ensure_dir(path)
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in glob(&pattern_str)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// All regular files below `dir`, relative to it, sorted.
///
/// Unreadable entries, dangling symlinks and symlink loops are errors.
pub fn walk_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        if entry.file_type().is_file() {
            files.push(relative_path(dir, entry.path()));
        }
    }
    files.sort();
    Ok(files)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Render a relative path with forward slashes.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
