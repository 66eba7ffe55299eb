use std::path::Path;

use anyhow::Result;
use nanoclaw_contracts::{ContainerInput, ContainerOutput};
use nanoclaw_core::{Dispatcher, RunnerConfig};
use tracing::{info, warn};

use super::read_stdin;
use crate::output::emit;

const HOOK_SUBCOMMAND: &str = "hook pre-compact";

/// Handle one request and return the process exit code.
pub async fn run() -> Result<i32> {
    let input = match read_stdin()
        .await
        .and_then(|raw| ContainerInput::parse(&raw).map_err(Into::into))
    {
        Ok(input) => input,
        Err(err) => {
            warn!("Failed to parse input: {:#}", err);
            emit(&ContainerOutput::error(format!(
                "Failed to parse input: {err:#}"
            )))?;
            return Ok(1);
        }
    };

    let mut config = RunnerConfig::container();
    match pre_compact_command(&config.paths.conversations_dir) {
        Ok(command) => config = config.with_pre_compact_command(command),
        Err(err) => warn!("Transcript archival disabled: {}", err),
    }

    let outcome = Dispatcher::with_claude_cli(config).dispatch(&input).await;
    emit(&outcome.output)?;
    info!(exit_code = outcome.exit_code, "Runner finished");
    Ok(outcome.exit_code)
}

/// Shell command that re-enters this binary as the engine's pre-compact hook.
fn pre_compact_command(conversations_dir: &Path) -> std::io::Result<String> {
    let exe = std::env::current_exe()?;
    Ok(format!(
        "{} {} --conversations-dir {}",
        shell_quote(&exe.to_string_lossy()),
        HOOK_SUBCOMMAND,
        shell_quote(&conversations_dir.to_string_lossy())
    ))
}

fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
