//! CLI argument structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::modes::Mode;

/// Answer the employment questions over a document store, normalized or combined
#[derive(Parser, Debug)]
#[command(name = "workforce")]
#[command(about = "workforce - employment queries over normalized and combined document layouts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP endpoints
    Serve {
        /// Address to bind, overriding the configuration
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Run create, insert, q1 and q2 once and print the responses
    Run {
        /// Layout to exercise; both when omitted
        #[arg(short, long, value_enum)]
        mode: Option<Mode>,
    },
}
