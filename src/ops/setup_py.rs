//! Implementation of `quay setup-py`.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

use anyhow::Result;
use indexmap::IndexMap;

use crate::core::graph::TargetId;
use crate::core::workspace::Workspace;
use crate::export::errors::ExportError;
use crate::export::reduced::DependencyCalculator;
use crate::export::sdist::ArchiveWriter;
use crate::export::setup_py::prepare_chroot;

/// Options for the setup-py command.
#[derive(Debug, Clone, Default)]
pub struct SetupPyOptions {
    /// Also package every published target the roots depend on
    pub recursive: bool,
}

/// Build source distributions for `roots`.
///
/// Returns each packaged target with the archive written for it, in the
/// order they were built.
pub fn setup_py(
    ws: &Workspace,
    roots: &[TargetId],
    writer: &dyn ArchiveWriter,
    opts: &SetupPyOptions,
) -> Result<IndexMap<TargetId, PathBuf>> {
    let graph = ws.graph();
    for &root in roots {
        if !graph.target(root).is_published() {
            return Err(ExportError::NotPublished {
                target: graph.address_of(root).clone(),
            }
            .into());
        }
    }

    let calc = DependencyCalculator::new(graph);
    let mut created = IndexMap::new();
    let mut queued: HashSet<TargetId> = roots.iter().copied().collect();
    let mut queue: VecDeque<TargetId> = roots.iter().copied().collect();

    while let Some(id) = queue.pop_front() {
        let chroot = prepare_chroot(ws, &calc, id)?;
        let archive = writer.write(&chroot.dir, &chroot.stem, ws.dist_dir())?;
        tracing::info!("wrote `{}` to {}", graph.address_of(id), archive.display());
        created.insert(id, archive);

        if opts.recursive {
            for &dep in &chroot.reduced {
                if graph.target(dep).is_published() && queued.insert(dep) {
                    queue.push_back(dep);
                }
            }
        }
    }

    Ok(created)
}
