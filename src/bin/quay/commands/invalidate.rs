//! `quay invalidate` command

use anyhow::Result;

use crate::cli::CleanArgs;
use quay::core::Workspace;
use quay::ops::invalidate;
use quay::util::GlobalContext;

pub fn execute(_args: CleanArgs, ctx: &GlobalContext) -> Result<()> {
    let ws = Workspace::load(ctx)?;
    invalidate(&ws)?;
    eprintln!("     Removed {}", ws.invalidator_dir().display());
    Ok(())
}
