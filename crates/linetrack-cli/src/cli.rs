use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "linetrack",
    about = "Incremental line diff tracking between two texts",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML file with a `[comparison]` table
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the changed blocks between two files
    Diff(DiffArgs),
    /// Apply an edit script to two files under a tracker and show the final blocks
    Replay(ReplayArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct DiffArgs {
    pub left: PathBuf,
    pub right: PathBuf,
}

#[derive(Args)]
pub struct ReplayArgs {
    pub left: PathBuf,
    pub right: PathBuf,
    /// JSON array of edit steps
    #[arg(short, long)]
    pub script: PathBuf,
}

#[derive(Args)]
pub struct ConfigArgs {}
