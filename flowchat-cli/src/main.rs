//! Flowchat CLI - command-line client for the Flowchat support chat.

mod commands;
mod render;

use anyhow::Result;
use clap::Parser;

use commands::{Commands, handle_command};
use flowchat_core::Config;

/// Flowchat CLI - stream and render support-chat answers
#[derive(Parser)]
#[command(name = "flowchat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Print the assistant's reasoning blocks
    #[arg(long, global = true)]
    show_thinking: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "cli: failed to load config, using defaults");
            Config::default()
        }
    };

    handle_command(args.command, config, args.show_thinking).await
}
