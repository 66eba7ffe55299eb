mod cli;
mod commands;
mod logging;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, HookCommands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init();

    let exit_code = match cli.command {
        None => commands::run::run().await?,
        Some(Commands::Hook {
            command: HookCommands::PreCompact(args),
        }) => commands::hook::pre_compact(args).await?,
    };

    std::process::exit(exit_code)
}
