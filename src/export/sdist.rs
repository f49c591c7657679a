//! Source distribution archives.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::util::archive::pack_tarball;

/// Turns a populated distribution chroot into an archive.
pub trait ArchiveWriter {
    /// Write an archive of `chroot` into `dest_dir`, returning its path.
    fn write(&self, chroot: &Path, stem: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Writes `<stem>.tar.gz` with every entry under `<stem>/`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarGzWriter;

impl ArchiveWriter for TarGzWriter {
    fn write(&self, chroot: &Path, stem: &str, dest_dir: &Path) -> Result<PathBuf> {
        let dest = dest_dir.join(format!("{}.tar.gz", stem));
        pack_tarball(chroot, &dest, stem)?;
        tracing::debug!("wrote {}", dest.display());
        Ok(dest)
    }
}
