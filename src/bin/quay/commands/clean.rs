//! `quay clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use quay::core::Workspace;
use quay::ops::clean;
use quay::util::GlobalContext;

pub fn execute(_args: CleanArgs, ctx: &GlobalContext) -> Result<()> {
    let ws = Workspace::load(ctx)?;
    clean(&ws)?;
    eprintln!("     Removed {}", ws.work_dir().display());
    Ok(())
}
