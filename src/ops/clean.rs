//! Implementation of `quay clean` and `quay invalidate`.

use anyhow::Result;

use crate::core::workspace::Workspace;
use crate::util::fs::cautious_remove_dir;

/// Remove the work dir and every build product in it.
pub fn clean(ws: &Workspace) -> Result<()> {
    tracing::info!("removing {}", ws.work_dir().display());
    cautious_remove_dir(ws.work_dir(), ws.root())
}

/// Forget every fingerprint so the next run resolves everything again.
pub fn invalidate(ws: &Workspace) -> Result<()> {
    let dir = ws.invalidator_dir();
    tracing::info!("removing {}", dir.display());
    cautious_remove_dir(&dir, ws.root())
}
