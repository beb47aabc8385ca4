//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Leveled, masked, rotating file logger with live WebSocket viewers
#[derive(Parser, Debug, Default)]
#[command(name = "loglens")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose internal diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ./loglens.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log directory (overrides config)
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Threshold level (overrides config)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log `<level> <message>` lines from stdin and stream them to live viewers
    Serve {
        /// WebSocket port for live viewers (overrides config)
        #[arg(long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Log a single message and exit
    Emit {
        /// error, warn, info, verbose, debug or silly
        level: String,

        /// Message text
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Print the structured history (logs.json) as JSON lines
    Snapshot,

    /// Write a config file with every setting at its default
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Split a stdin line into `(level, message)`. Lines without a message are
/// logged as an empty message.
pub fn parse_input_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    let line = line.trim_start();
    match line.split_once(' ') {
        Some((level, message)) => Some((level, message)),
        None => Some((line, "")),
    }
}

// =============================================================================
// Tests
// =============================================================================
