//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// RouteAgent - conversational cycling route planner
#[derive(Debug, Parser)]
#[command(
    name = "ra",
    about = "Plan cycling routes with an AI assistant, one checkpoint at a time",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (default: chat)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Start an interactive planning session
    Chat {
        /// Opening request, sent before the first prompt
        query: Option<String>,
    },

    /// Plan a single route from QUERY, then exit
    Run {
        /// What kind of ride you want
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Print the effective configuration as YAML
    Config,

    /// Print the rendered system prompt
    Prompt,
}
