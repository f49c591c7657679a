//! `quay node-install` command

use anyhow::Result;

use crate::cli::ResolveArgs;
use quay::core::Workspace;
use quay::ops::{default_registry, node_install};
use quay::util::fs::relative_path;
use quay::util::{GlobalContext, SystemRunner};

pub fn execute(args: ResolveArgs, ctx: &GlobalContext) -> Result<()> {
    let ws = Workspace::load(ctx)?;
    let roots = ws.parse_targets(&args.targets)?;

    let installed = node_install(
        &ws,
        &roots,
        &default_registry(),
        &SystemRunner,
        args.passthru,
        ctx.is_verbose(),
    )?;

    if installed.is_empty() {
        eprintln!("warning: none of the requested targets is a node package");
    }
    for (id, path) in installed {
        eprintln!(
            "   Installed {} into {}",
            ws.graph().address_of(id),
            relative_path(ws.root(), &path).display()
        );
    }

    Ok(())
}
