//! `quay owners` command

use anyhow::Result;

use crate::cli::OwnersArgs;
use quay::core::Workspace;
use quay::ops::{format_reports, owners};
use quay::util::GlobalContext;

pub fn execute(args: OwnersArgs, ctx: &GlobalContext) -> Result<()> {
    let ws = Workspace::load(ctx)?;
    let targets = ws.parse_targets(&args.targets)?;

    let reports = owners(&ws, &targets)?;
    print!("{}", format_reports(&reports));
    Ok(())
}
