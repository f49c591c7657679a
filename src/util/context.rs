//! Global context for Quay operations.
//!
//! Provides centralized access to the working directory, the user-wide
//! cache location and output preferences.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

use crate::core::workspace::{find_build_root, WorkspaceError};

/// Project directories for Quay
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("com", "quay", "quay"));

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for user-wide Quay data
    home: PathBuf,

    /// Whether to use verbose output
    verbose: bool,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::at(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        Ok(Self::at(cwd))
    }

    fn at(cwd: PathBuf) -> Self {
        let home = match PROJECT_DIRS.as_ref() {
            Some(dirs) => dirs.cache_dir().to_path_buf(),
            None => cwd.join(".quay-home"),
        };

        GlobalContext {
            cwd,
            home,
            verbose: false,
            color: true,
        }
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the Quay home directory.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Default artifact cache directory.
    pub fn artifact_cache_dir(&self) -> PathBuf {
        self.home.join("artifacts")
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Find the build root (directory containing quay.toml) from cwd upward.
    pub fn find_build_root(&self) -> Result<PathBuf, WorkspaceError> {
        find_build_root(&self.cwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_paths() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf()).unwrap();
        assert_eq!(ctx.cwd(), tmp.path());
        assert!(ctx.artifact_cache_dir().ends_with("artifacts"));
        assert!(!ctx.is_verbose());
        assert!(ctx.color());
    }

    #[test]
    fn test_find_build_root_from_subdir() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("quay.toml"), "").unwrap();
        let nested = tmp.path().join("src/python/foo");
        std::fs::create_dir_all(&nested).unwrap();

        let ctx = GlobalContext::with_cwd(nested).unwrap();
        assert_eq!(ctx.find_build_root().unwrap(), tmp.path());
    }
}
