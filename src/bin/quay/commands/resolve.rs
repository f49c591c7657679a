//! `quay resolve` command

use anyhow::Result;

use crate::cli::ResolveArgs;
use quay::core::Workspace;
use quay::ops::{default_registry, resolve, ResolveRunOptions};
use quay::resolver::{ResolveMode, TargetState};
use quay::util::fs::relative_path;
use quay::util::{GlobalContext, SystemRunner};

pub fn execute(args: ResolveArgs, ctx: &GlobalContext) -> Result<()> {
    run(args, ctx, ResolveMode::Isolated)
}

/// Shared by `resolve` and `resolve-local`.
pub(crate) fn run(args: ResolveArgs, ctx: &GlobalContext, mode: ResolveMode) -> Result<()> {
    let ws = Workspace::load(ctx)?;
    let roots = ws.parse_targets(&args.targets)?;

    let opts = ResolveRunOptions {
        mode,
        passthru: args.passthru,
        verbose: ctx.is_verbose(),
    };
    let (node_paths, report) = resolve(&ws, &roots, &default_registry(), &SystemRunner, &opts)?;

    for id in report.with_state(TargetState::Resolved) {
        if let Some(path) = node_paths.node_path(id) {
            eprintln!(
                "    Resolved {} -> {}",
                ws.graph().address_of(id),
                relative_path(ws.root(), path).display()
            );
        }
    }
    for id in report.with_state(TargetState::Restored) {
        eprintln!("    Restored {} from cache", ws.graph().address_of(id));
    }
    if !report.states.is_empty() {
        eprintln!("    {}", report.summary());
    }

    Ok(())
}
