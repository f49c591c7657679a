//! Quay CLI - packaging and node module resolution over a target graph

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use quay::export::ExportError;
use quay::resolver::ResolveError;
use quay::core::workspace::WorkspaceError;
use quay::core::GraphError;
use quay::util::diagnostic::{emit, suggestions, Diagnostic};
use quay::util::fs::SafetyViolation;
use quay::util::GlobalContext;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        report(&e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("quay=debug")
    } else {
        EnvFilter::new("quay=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    ctx.set_color(!cli.no_color);

    // Execute command
    match cli.command {
        Commands::Resolve(args) => commands::resolve::execute(args, &ctx),
        Commands::ResolveLocal(args) => commands::resolve_local::execute(args, &ctx),
        Commands::NodeInstall(args) => commands::node_install::execute(args, &ctx),
        Commands::SetupPy(args) => commands::setup_py::execute(args, &ctx),
        Commands::Test(args) => commands::test::execute(args, &ctx),
        Commands::Clean(args) => commands::clean::execute(args, &ctx),
        Commands::Invalidate(args) => commands::invalidate::execute(args, &ctx),
        Commands::Owners(args) => commands::owners::execute(args, &ctx),
    }
}

/// Print known errors as diagnostics, everything else as its context chain.
fn report(e: &anyhow::Error, color: bool) {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<ExportError>() {
            emit(&err.to_diagnostic(), color);
            return;
        }
        if let Some(err) = cause.downcast_ref::<ResolveError>() {
            emit(&err.to_diagnostic(), color);
            return;
        }
        if let Some(err) = cause.downcast_ref::<WorkspaceError>() {
            emit(
                &Diagnostic::error(err.to_string()).with_suggestion(suggestions::NO_BUILD_ROOT),
                color,
            );
            return;
        }
        let unknown = cause.downcast_ref::<GraphError>();
        if let Some(err) = unknown.filter(|err| matches!(err, GraphError::UnknownAddress { .. })) {
            emit(
                &Diagnostic::error(e.to_string())
                    .with_context(err.to_string())
                    .with_suggestion(suggestions::TARGET_NOT_FOUND),
                color,
            );
            return;
        }
        if let Some(err) = cause.downcast_ref::<SafetyViolation>() {
            emit(
                &Diagnostic::error(err.to_string()).with_suggestion(suggestions::SAFETY_VIOLATION),
                color,
            );
            return;
        }
    }
    eprintln!("error: {:#}", e);
}
