//! `quay setup-py` command

use anyhow::Result;

use crate::cli::SetupPyArgs;
use quay::core::Workspace;
use quay::export::TarGzWriter;
use quay::ops::{setup_py, SetupPyOptions};
use quay::util::fs::relative_path;
use quay::util::GlobalContext;

pub fn execute(args: SetupPyArgs, ctx: &GlobalContext) -> Result<()> {
    let ws = Workspace::load(ctx)?;
    let roots = ws.parse_targets(&args.targets)?;

    let opts = SetupPyOptions {
        recursive: args.recursive,
    };
    let created = setup_py(&ws, &roots, &TarGzWriter, &opts)?;

    for archive in created.values() {
        eprintln!("     Created {}", relative_path(ws.root(), archive).display());
    }

    Ok(())
}
