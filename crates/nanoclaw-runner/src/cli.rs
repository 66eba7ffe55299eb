use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "agent-runner")]
#[command(
    version,
    about = "NanoClaw agent runner: reads one request on stdin and prints one framed result"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Callbacks invoked by the interactive engine
    Hook {
        #[command(subcommand)]
        command: HookCommands,
    },
}

#[derive(Subcommand)]
pub enum HookCommands {
    /// Archive the transcript before the engine compacts it
    PreCompact(PreCompactArgs),
}

#[derive(Args, Debug, Default)]
pub struct PreCompactArgs {
    /// Directory receiving the markdown archive (defaults to the group's conversations dir)
    #[arg(long)]
    pub conversations_dir: Option<PathBuf>,
}
