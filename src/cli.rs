//! CLI command definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tempo - task timers with live completion push
#[derive(Parser, Debug)]
#[command(name = "tempo")]
#[command(version)]
#[command(about = "Task timers with countdowns, alarms and live completion push")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API, push channel and reconciliation loop
    Serve {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to bind, overriding the configuration
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Print a bearer token for a user
    IssueToken {
        /// User id the token is issued for
        #[arg(short, long)]
        user: String,

        /// TOML configuration file holding the token secret
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
