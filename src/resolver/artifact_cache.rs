//! Local artifact cache for isolated resolve results.
//!
//! Entries are gzipped tarballs of a results directory stored at
//! `<cache>/<target-id>/<fingerprint>.tar.gz`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::Address;
use crate::util::archive::{extract_tarball, pack_tarball};
use crate::util::fs::recreate_dir;

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    pub fn new(dir: PathBuf) -> Self {
        ArtifactCache { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, target: &Address, fingerprint: &str) -> PathBuf {
        self.dir
            .join(target.id())
            .join(format!("{}.tar.gz", fingerprint))
    }

    pub fn contains(&self, target: &Address, fingerprint: &str) -> bool {
        self.entry_path(target, fingerprint).is_file()
    }

    /// Restore a cached results directory into `dest`.
    ///
    /// Returns `false` on a miss. A hit replaces whatever `dest` held.
    pub fn fetch(&self, target: &Address, fingerprint: &str, dest: &Path) -> Result<bool> {
        let entry = self.entry_path(target, fingerprint);
        if !entry.is_file() {
            return Ok(false);
        }
        let data = std::fs::read(&entry)
            .with_context(|| format!("failed to read cache entry {}", entry.display()))?;
        recreate_dir(dest)?;
        extract_tarball(&data, dest, None)?;
        tracing::debug!("restored `{}` from {}", target, entry.display());
        Ok(true)
    }

    /// Store `results_dir` for `target` at `fingerprint`.
    pub fn store(&self, target: &Address, fingerprint: &str, results_dir: &Path) -> Result<()> {
        let entry = self.entry_path(target, fingerprint);
        pack_tarball(results_dir, &entry, "")?;
        tracing::debug!("cached `{}` at {}", target, entry.display());
        Ok(())
    }
}
