//! GovSight CLI: boots an in-process kernel for each command.

mod cli;
mod cmd;
mod ui;

use crate::cli::*;
use clap::Parser;
use govsight_kernel::config::configured_log_level;
use govsight_types::config::default_home_dir;

/// Load `.env` from the working directory, then `~/.govsight/.env`.
/// Variables already set in the environment win.
fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let _ = dotenvy::from_path(default_home_dir().join(".env"));
}

fn init_tracing_stderr(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    load_dotenv();
    let cli = Cli::parse();

    // One-shot commands stay quiet unless RUST_LOG says otherwise; chat
    // logs at the configured level. Commands load the full config after the
    // subscriber is up.
    match cli.command {
        Commands::Chat => init_tracing_stderr(&configured_log_level(cli.config.as_deref())),
        _ => init_tracing_stderr("warn"),
    }

    match cli.command {
        Commands::Init => cmd::system::cmd_init(cli.config),
        Commands::Ask {
            query,
            timeout,
            json,
        } => cmd::ask::cmd_ask(cli.config, &query, timeout, json),
        Commands::Chat => cmd::ask::cmd_chat(cli.config),
        Commands::Teach { statement } => cmd::facts::cmd_teach(cli.config, &statement),
        Commands::Fact(sub) => match sub {
            FactCommands::Put {
                subject,
                attribute,
                value,
                source,
            } => cmd::facts::cmd_fact_put(cli.config, &subject, &attribute, &value, source),
            FactCommands::Get { subject, attribute } => {
                cmd::facts::cmd_fact_get(cli.config, &subject, &attribute)
            }
            FactCommands::Delete { subject, attribute } => {
                cmd::facts::cmd_fact_delete(cli.config, &subject, &attribute)
            }
            FactCommands::List { subject, json } => {
                cmd::facts::cmd_fact_list(cli.config, &subject, json)
            }
        },
        Commands::Passage(sub) => match sub {
            PassageCommands::Add { text, source } => {
                cmd::facts::cmd_passage_add(cli.config, &text, source)
            }
        },
        Commands::Stats { json } => cmd::system::cmd_stats(cli.config, json),
    }
}
