//! Implementation of `quay node-install`.
//!
//! Installs node modules into their source directories for development.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::graph::TargetId;
use crate::core::workspace::Workspace;
use crate::ops::resolve::{resolve, ResolveRunOptions};
use crate::resolver::{ResolveMode, ResolverRegistry};
use crate::util::process::ProcessRunner;

/// Resolve `roots` locally and return the node path of each root module.
pub fn node_install(
    ws: &Workspace,
    roots: &[TargetId],
    registry: &ResolverRegistry,
    runner: &dyn ProcessRunner,
    passthru: Vec<String>,
    verbose: bool,
) -> Result<Vec<(TargetId, PathBuf)>> {
    let opts = ResolveRunOptions {
        mode: ResolveMode::Local,
        passthru,
        verbose,
    };
    let (node_paths, _) = resolve(ws, roots, registry, runner, &opts)?;

    let mut installed = Vec::new();
    for &root in roots {
        let target = ws.target(root);
        if !target.kind().is_node_package() {
            continue;
        }
        match node_paths.node_path(root) {
            Some(path) => {
                tracing::debug!("installed `{}` into {}", target.address, path.display());
                installed.push((root, path.to_path_buf()));
            }
            None => tracing::warn!("`{}` has no resolver; nothing installed", target.address),
        }
    }
    Ok(installed)
}
