use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gitdown", version)]
#[command(
    about = "Download a GitHub repository's default branch and set it up locally",
    long_about = None
)]
pub struct Cli {
    /// GitHub user or organization (e.g. acme)
    #[arg(long, visible_alias = "user", alias = "gitdown")]
    pub owner: String,

    /// Repository name (e.g. widget)
    #[arg(long)]
    pub repo: String,

    /// Root folder repositories are extracted under (defaults to your Downloads folder)
    #[arg(long, value_name = "DIR")]
    pub downloads_dir: Option<PathBuf>,

    /// Folder the zip is saved in before extraction (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub archive_dir: Option<PathBuf>,

    /// Skip installing dependencies after extraction
    #[arg(long)]
    pub no_install: bool,

    /// Network timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output style
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Read settings from this file instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored status lines and progress bars
    Human,
    /// One JSON event per line on stdout
    Json,
}
