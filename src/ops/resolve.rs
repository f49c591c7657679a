//! Implementation of `quay resolve` and `quay resolve-local`.

use anyhow::Result;

use crate::core::graph::TargetId;
use crate::core::target::TargetKind;
use crate::core::workspace::Workspace;
use crate::resolver::{
    FingerprintStore, NodePaths, NpmResolver, PreinstalledModuleResolver, ResolveContext,
    ResolveExecutor, ResolveMode, ResolveReport, ResolverRegistry,
};
use crate::util::process::ProcessRunner;

/// Options for a resolve run.
#[derive(Debug, Clone)]
pub struct ResolveRunOptions {
    pub mode: ResolveMode,
    /// Extra package manager arguments
    pub passthru: Vec<String>,
    pub verbose: bool,
}

impl ResolveRunOptions {
    pub fn new(mode: ResolveMode) -> Self {
        ResolveRunOptions {
            mode,
            passthru: Vec::new(),
            verbose: false,
        }
    }
}

/// The resolvers quay ships with.
pub fn default_registry() -> ResolverRegistry {
    let mut registry = ResolverRegistry::new();
    registry.register(TargetKind::NodeModule, Box::new(NpmResolver));
    registry.register(
        TargetKind::NodePreinstalledModule,
        Box::new(PreinstalledModuleResolver),
    );
    registry
}

/// Fingerprint store scope for a mode.
fn scope(mode: ResolveMode) -> &'static str {
    match mode {
        ResolveMode::Isolated => "resolve",
        ResolveMode::Local => "resolve-local",
    }
}

/// Resolve every node package reachable from `roots`.
pub fn resolve(
    ws: &Workspace,
    roots: &[TargetId],
    registry: &ResolverRegistry,
    runner: &dyn ProcessRunner,
    opts: &ResolveRunOptions,
) -> Result<(NodePaths, ResolveReport)> {
    let mut store = FingerprintStore::open(ws, scope(opts.mode))?;
    let mut node_paths = NodePaths::new();

    let report = ResolveExecutor::new(ResolveContext::new(ws, runner), registry, opts.mode)
        .passthru(opts.passthru.clone())
        .verbose(opts.verbose)
        .execute(roots, &mut store, &mut node_paths)?;

    Ok((node_paths, report))
}
