//! Implementation of `quay test` for karma test targets.

use anyhow::Result;
use thiserror::Error;

use crate::core::graph::TargetId;
use crate::core::target::{Payload, TargetKind};
use crate::core::workspace::Workspace;
use crate::core::Address;
use crate::ops::resolve::{resolve, ResolveRunOptions};
use crate::resolver::{NodePaths, ResolveMode, ResolverRegistry};
use crate::util::port::with_ephemeral_port;
use crate::util::process::{resolve_executable, ProcessBuilder, ProcessRunner};

/// Error running karma tests.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum KarmaError {
    #[error("`{target}` failed: `{command}` exited with code {code}")]
    #[diagnostic(code(quay::test::failed))]
    Failed {
        target: Address,
        command: String,
        code: i32,
    },

    #[error("`{target}` has no node module dependency to test")]
    #[diagnostic(code(quay::test::no_module))]
    NoModule { target: Address },

    #[error("`{dependency}` (tested by `{target}`) was not resolved")]
    #[diagnostic(code(quay::test::unresolved))]
    Unresolved { target: Address, dependency: Address },
}

/// Roots that are karma test targets.
pub fn karma_targets(ws: &Workspace, roots: &[TargetId]) -> Vec<TargetId> {
    roots
        .iter()
        .copied()
        .filter(|&id| ws.target(id).kind() == TargetKind::NodeKarmaTests)
        .collect()
}

/// The karma invocation for a test target, run from the module directory.
pub fn karma_command(
    ws: &Workspace,
    karma_bin: &str,
    config: &str,
    port: u16,
    passthru: &[String],
) -> ProcessBuilder {
    ProcessBuilder::new(resolve_executable(ws.config().node_executable()))
        .arg(karma_bin)
        .args(["start", config, "--single-run", "--port"])
        .arg(port.to_string())
        .arg("--")
        .args(passthru)
}

/// Run each karma test target in `targets` against already resolved modules.
///
/// Each target runs from the node path of its first dependency.
pub fn run_karma_tests(
    ws: &Workspace,
    targets: &[TargetId],
    node_paths: &NodePaths,
    runner: &dyn ProcessRunner,
    passthru: &[String],
) -> Result<()> {
    let graph = ws.graph();
    for &id in targets {
        let target = graph.target(id);
        let Payload::NodeKarmaTests { karma_bin, config } = &target.payload else {
            continue;
        };
        let module = graph
            .dependencies_of(id)
            .first()
            .copied()
            .ok_or_else(|| KarmaError::NoModule {
                target: target.address.clone(),
            })?;
        let node_path = node_paths
            .node_path(module)
            .ok_or_else(|| KarmaError::Unresolved {
                target: target.address.clone(),
                dependency: graph.address_of(module).clone(),
            })?;

        tracing::debug!("testing node module (first dependency): `{}`", graph.address_of(module));
        let (command, code) = with_ephemeral_port::<_, anyhow::Error>(|lease| {
            let cmd = karma_command(ws, karma_bin, config, lease.port(), passthru).cwd(node_path);
            tracing::info!("running `{}` for `{}`", cmd.display_command(), target.address);
            lease.release();
            let code = runner.run(&cmd)?;
            Ok((cmd.display_command(), code))
        })?;

        if code != 0 {
            return Err(KarmaError::Failed {
                target: target.address.clone(),
                command,
                code,
            }
            .into());
        }
    }
    Ok(())
}

/// Resolve the node modules under test, then run every karma root.
pub fn test(
    ws: &Workspace,
    roots: &[TargetId],
    registry: &ResolverRegistry,
    runner: &dyn ProcessRunner,
    passthru: &[String],
    verbose: bool,
) -> Result<usize> {
    let targets = karma_targets(ws, roots);
    if targets.is_empty() {
        tracing::info!("no karma test targets among the requested targets");
        return Ok(0);
    }

    let mut opts = ResolveRunOptions::new(ResolveMode::Isolated);
    opts.verbose = verbose;
    let (node_paths, _) = resolve(ws, &targets, registry, runner, &opts)?;

    run_karma_tests(ws, &targets, &node_paths, runner, passthru)?;
    Ok(targets.len())
}
