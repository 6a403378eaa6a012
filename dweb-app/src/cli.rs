use clap::Parser;
use std::path::PathBuf;

/// Browse the web from a line-oriented prompt through a text browser and a pager.
#[derive(Debug, Parser)]
#[command(name = "dweb", version, about)]
pub struct Cli {
    /// Page to open before the first prompt.
    pub url: Option<String>,

    /// Configuration file (YAML, TOML or JSON, by suffix).
    #[arg(short, long, env = "DWEB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Dump-mode browser to run (overrides config and $BROWSER).
    #[arg(long)]
    pub browser: Option<String>,

    /// Pager to run (overrides config and $PAGER).
    #[arg(long)]
    pub pager: Option<String>,

    /// Always show the banner and prompt.
    #[arg(long, conflicts_with = "batch")]
    pub interactive: bool,

    /// Never show the banner and prompt.
    #[arg(long)]
    pub batch: bool,

    /// Duplicate log events to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// `Some` when a flag forces the chatty mode either way.
    pub fn chatty_override(&self) -> Option<bool> {
        match (self.interactive, self.batch) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}
