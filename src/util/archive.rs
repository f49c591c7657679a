//! Gzipped tarball packing and extraction.

use std::io::Cursor;
use std::path::Path;

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Archive, Builder};
use tempfile::NamedTempFile;

use crate::util::fs::{ensure_dir, walk_files};

/// Pack every file below `src_dir` into `dest`, each entry under `prefix/`.
///
/// The archive is written next to `dest` and moved into place once complete.
pub fn pack_tarball(src_dir: &Path, dest: &Path, prefix: &str) -> Result<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;
    let tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create archive in {}", parent.display()))?;

    let encoder = GzEncoder::new(tmp.as_file(), Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(true);

    for rel in walk_files(src_dir)? {
        let name = Path::new(prefix).join(&rel);
        builder
            .append_path_with_name(src_dir.join(&rel), &name)
            .with_context(|| format!("failed to add {} to archive", rel.display()))?;
    }

    let encoder = builder
        .into_inner()
        .context("failed to finish tar stream")?;
    encoder.finish().context("failed to finish gzip stream")?;

    tmp.persist(dest)
        .map_err(|e| e.error)
        .with_context(|| format!("failed to write archive: {}", dest.display()))?;
    Ok(())
}

/// Extract a gzipped tarball into `dest`.
///
/// When `strip_prefix` is given, a leading `prefix/` is removed from entry
/// paths and the prefix directory entry itself is skipped.
pub fn extract_tarball(data: &[u8], dest: &Path, strip_prefix: Option<&str>) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));
    ensure_dir(dest)?;
    let canonical_dest = dest.canonicalize().unwrap_or_else(|_| dest.to_path_buf());

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry
            .path()
            .context("failed to get entry path")?
            .to_string_lossy()
            .replace('\\', "/");

        let relative = match strip_prefix.map(|p| p.trim_end_matches('/')) {
            Some(prefix) if entry_path == prefix || entry_path == format!("{}/", prefix) => {
                continue
            }
            Some(prefix) => entry_path
                .strip_prefix(&format!("{}/", prefix))
                .unwrap_or(&entry_path)
                .to_string(),
            None => entry_path.clone(),
        };
        if relative.is_empty() {
            continue;
        }

        if Path::new(&relative)
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir | std::path::Component::RootDir))
        {
            bail!("tarball entry escapes destination directory: {}", entry_path);
        }

        let output_path = canonical_dest.join(&relative);
        if let Some(parent) = output_path.parent() {
            ensure_dir(parent)?;
        }

        match entry.header().entry_type() {
            tar::EntryType::Directory => ensure_dir(&output_path)?,
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                entry.unpack(&output_path).with_context(|| {
                    format!("failed to extract file: {}", output_path.display())
                })?;
            }
            tar::EntryType::Symlink => {
                #[cfg(unix)]
                if let Some(link) = entry.link_name().context("failed to read link name")? {
                    std::os::unix::fs::symlink(&link, &output_path).with_context(|| {
                        format!("failed to create symlink: {}", output_path.display())
                    })?;
                }
            }
            other => {
                tracing::debug!("skipping tarball entry {} of type {:?}", entry_path, other);
            }
        }
    }

    Ok(())
}
