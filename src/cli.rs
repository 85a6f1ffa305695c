use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub(crate) const DEFAULT_PROMPT: &str =
    "Based on the provided texts, explain the relationship between the jivatma and Krsna.";

#[derive(Debug, Parser)]
#[command(name = "manas", version, about = "Retrieval-augmented persona assistant")]
pub(crate) struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Persona to answer as (sage or devotee)
    #[arg(long, global = true, value_name = "NAME")]
    pub persona: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Update the index and answer a single prompt
    Ask {
        #[arg(default_value = DEFAULT_PROMPT)]
        prompt: String,
    },
    /// Update the index and serve the chat API over HTTP
    Serve,
    /// Update the index and report its size
    Index,
}
