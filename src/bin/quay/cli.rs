//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};

/// Quay - dependency-aware packaging and node module resolution
#[derive(Parser)]
#[command(name = "quay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve node packages into isolated, cached result directories
    Resolve(ResolveArgs),

    /// Resolve node packages in place, inside their source directories
    ResolveLocal(ResolveArgs),

    /// Install node modules into their source directories for development
    NodeInstall(ResolveArgs),

    /// Build source distributions for published python targets
    SetupPy(SetupPyArgs),

    /// Run karma tests against resolved node modules
    Test(TestArgs),

    /// Remove the work directory
    Clean(CleanArgs),

    /// Forget fingerprints so the next run resolves everything again
    Invalidate(CleanArgs),

    /// Show the owner and reduced dependencies of targets
    Owners(OwnersArgs),
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Target specs (e.g. `src/node/app` or `src/node/app:app`)
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Extra arguments passed to the package manager
    #[arg(last = true)]
    pub passthru: Vec<String>,
}

#[derive(Args)]
pub struct SetupPyArgs {
    /// Published target specs
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Also package every published target the roots depend on
    #[arg(long)]
    pub recursive: bool,
}

#[derive(Args)]
pub struct TestArgs {
    /// Karma test target specs
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Extra arguments passed to karma
    #[arg(last = true)]
    pub passthru: Vec<String>,
}

#[derive(Args)]
pub struct CleanArgs {}

#[derive(Args)]
pub struct OwnersArgs {
    /// Target specs
    #[arg(required = true)]
    pub targets: Vec<String>,
}
