//! `quay resolve-local` command

use anyhow::Result;

use crate::cli::ResolveArgs;
use quay::resolver::ResolveMode;
use quay::util::GlobalContext;

pub fn execute(args: ResolveArgs, ctx: &GlobalContext) -> Result<()> {
    super::resolve::run(args, ctx, ResolveMode::Local)
}
