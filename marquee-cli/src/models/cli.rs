use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Marquee: a movie recommendation chatbot.
/// Starts an interactive session by default, or answers a single message non-interactively.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase message verbosity.
    ///
    /// Specify multiple times for more verbose output:
    ///  -v:  INFO level
    ///  -vv: DEBUG level
    ///  -vvv: TRACE level (most verbose)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to a TOML configuration file. Defaults to ./Marquee.toml when present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Send a single message non-interactively and print the answer.
    #[arg(short, long)]
    pub turn: Option<String>,
}
