use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Command line interface for the repository workspace.
#[derive(Parser, Debug)]
#[command(
    name = "ghq",
    version,
    about = "Keep local repositories under a host/owner/repo tree and jump into them"
)]
pub struct Cli {
    /// Workspace root to use instead of the configured ones (repeatable; the
    /// first receives new repositories).
    #[arg(long = "root", global = true, value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    /// Config file (defaults to $GHQ_CONFIG or ~/.config/ghq/config.toml).
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Create an empty repository at its canonical local path.",
        long_about = "Maps the name to <root>/<host>/<owner>/<repo>, refuses non-empty targets, initializes the repository with the selected or detected VCS, and prints the path."
    )]
    Create(CreateOpts),
    #[command(
        about = "Open a shell inside the repository matching a query.",
        long_about = "Scans every root for repositories whose path matches the query. Exactly one match starts the configured shell there with GHQ_LOOK set to its relative path."
    )]
    Look(LookOpts),
    #[command(about = "List local repositories, optionally filtered by a query.")]
    List(ListOpts),
    #[command(about = "Print the workspace root(s).")]
    Root(RootOpts),
}

#[derive(Args, Debug, Clone)]
pub struct CreateOpts {
    /// Repository URL or shorthand (repo, owner/repo, host/owner/repo).
    pub name: String,

    /// VCS to initialize with instead of detecting one (git, hg, darcs, bzr, pijul).
    #[arg(long)]
    pub vcs: Option<String>,

    /// Open a shell in the new repository afterwards.
    #[arg(long)]
    pub look: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LookOpts {
    /// Repository name, path fragment, or URL.
    pub query: String,
}

#[derive(Args, Debug, Clone)]
pub struct ListOpts {
    /// Only show repositories whose relative path contains this text.
    pub query: Option<String>,

    /// Match whole path segments instead of any substring.
    #[arg(long, short = 'e')]
    pub exact: bool,

    /// Print absolute paths.
    #[arg(long, short = 'p')]
    pub full_path: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RootOpts {
    /// Print every root, not just the primary one.
    #[arg(long)]
    pub all: bool,
}
