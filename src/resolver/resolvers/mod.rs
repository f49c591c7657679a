//! Resolver strategies for node packages.

mod npm;
mod preinstalled;

pub use npm::NpmResolver;
pub use preinstalled::PreinstalledModuleResolver;

use std::path::Path;

use anyhow::{bail, Result};

use crate::core::address::normalize_spec_path;
use crate::core::graph::{TargetGraph, TargetId};
use crate::core::workspace::Workspace;
use crate::resolver::node_paths::NodePaths;
use crate::util::config::Config;
use crate::util::fs::{copy_file, relative_path};
use crate::util::process::ProcessRunner;

/// Flags controlling one resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Install into the target's source directory instead of a results dir
    pub resolve_locally: bool,
    pub force: bool,
    pub install_optional: bool,
    pub frozen_lockfile: bool,
    /// Extra arguments handed to the package manager
    pub passthru: Vec<String>,
}

impl ResolveOptions {
    /// Options for isolated resolves, taken from `[node]` config.
    pub fn isolated(config: &Config) -> Self {
        ResolveOptions {
            resolve_locally: false,
            force: config.node.force.unwrap_or(false),
            install_optional: config.node.install_optional.unwrap_or(false),
            frozen_lockfile: config.node.frozen_lockfile.unwrap_or(false),
            passthru: Vec::new(),
        }
    }

    /// Options for installs into source directories.
    pub fn local() -> Self {
        ResolveOptions {
            resolve_locally: true,
            force: true,
            install_optional: true,
            frozen_lockfile: false,
            passthru: Vec::new(),
        }
    }

    pub fn with_passthru(mut self, passthru: Vec<String>) -> Self {
        self.passthru = passthru;
        self
    }
}

/// What a resolver may touch while running.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub workspace: &'a Workspace,
    pub runner: &'a dyn ProcessRunner,
}

impl<'a> ResolveContext<'a> {
    pub fn new(workspace: &'a Workspace, runner: &'a dyn ProcessRunner) -> Self {
        ResolveContext { workspace, runner }
    }

    pub fn graph(&self) -> &'a TargetGraph {
        self.workspace.graph()
    }
}

/// Materializes a node package and its dependencies into a directory.
pub trait NodeResolver {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Called once per run before any target is resolved.
    fn prepare(&self, _ctx: &ResolveContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Resolve `target` into `results_dir`.
    ///
    /// Every resolvable dependency of `target` is already in `node_paths`.
    /// Running again for the same directory and target state must leave the
    /// same result.
    fn resolve_target(
        &self,
        ctx: &ResolveContext<'_>,
        target: TargetId,
        results_dir: &Path,
        node_paths: &NodePaths,
        options: &ResolveOptions,
    ) -> Result<()>;
}

/// Copy a target's sources into `results_dir`, keeping their paths relative
/// to the target's directory.
pub fn copy_sources(ws: &Workspace, target: TargetId, results_dir: &Path) -> Result<()> {
    let target_dir = ws.target_dir(target);
    for source in ws.target_sources(target)? {
        copy_file(&source, &results_dir.join(relative_path(&target_dir, &source)))?;
    }
    Ok(())
}

/// Find the dependency of `target` named `package_name` that lives at the
/// `file:<relative path>` reference `file_path`.
///
/// Returns `None` when no dependency matches.
pub fn target_from_package_name(
    graph: &TargetGraph,
    target: TargetId,
    package_name: &str,
    file_path: &str,
) -> Result<Option<TargetId>> {
    let Some(relative) = file_path.strip_prefix("file:") else {
        bail!("`{}` is not a file: reference", file_path);
    };

    let spec_path = graph.address_of(target).spec_path();
    let joined = if spec_path.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", spec_path, relative)
    };
    let Some(dep_spec_path) = normalize_spec_path(&joined) else {
        return Ok(None);
    };

    Ok(graph.dependencies_of(target).iter().copied().find(|&dep| {
        let dep_target = graph.target(dep);
        dep_target.package_name() == Some(package_name)
            && dep_target.address.spec_path() == dep_spec_path
    }))
}
