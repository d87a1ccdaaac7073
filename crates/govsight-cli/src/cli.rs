//! Clap CLI definitions for GovSight.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const AFTER_HELP: &str = "\
\x1b[1;36mExamples:\x1b[0m
  govsight init                                   Write ~/.govsight/config.toml
  govsight teach \"The mayor of Grandview, TX is Jane Doe.\"
  govsight ask \"who is the mayor of grandview, tx?\"
  govsight fact list \"grandview tx\"
  govsight passage add \"Council minutes ...\" --source minutes.pdf
  govsight chat                                   Ask questions line by line";

/// GovSight: factual answers from local facts, indexed passages and the web.
#[derive(Parser)]
#[command(name = "govsight", version, after_help = AFTER_HELP)]
pub struct Cli {
    /// Path to config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create ~/.govsight/ and write the default config.
    Init,
    /// Answer a single question.
    Ask {
        /// The question.
        query: String,
        /// Per-query timeout in seconds (0 disables).
        #[arg(long)]
        timeout: Option<u64>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Ask questions interactively, one per line.
    Chat,
    /// Store a fact from a sentence like "The mayor of X is Y."
    Teach {
        /// The statement.
        statement: String,
    },
    /// Manage stored facts [*].
    #[command(subcommand)]
    Fact(FactCommands),
    /// Manage indexed passages [*].
    #[command(subcommand)]
    Passage(PassageCommands),
    /// Show store sizes and configuration.
    Stats {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum FactCommands {
    /// Store or overwrite a fact.
    Put {
        subject: String,
        attribute: String,
        value: String,
        /// Where the fact came from.
        #[arg(long)]
        source: Option<String>,
    },
    /// Look up one fact.
    Get { subject: String, attribute: String },
    /// Delete one fact.
    Delete { subject: String, attribute: String },
    /// List every fact for a subject.
    List {
        subject: String,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum PassageCommands {
    /// Embed and index a passage for semantic lookup.
    Add {
        /// Passage text.
        text: String,
        /// Where the passage came from.
        #[arg(long)]
        source: Option<String>,
    },
}
