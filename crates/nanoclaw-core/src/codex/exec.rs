use std::process::Stdio;

use nanoclaw_contracts::ContainerInput;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};

use super::auth::validate_codex_auth;
use super::config_toml::{CodexSettings, ensure_codex_config};
use super::prelude::build_codex_prelude;
use crate::config::Credentials;
use crate::error::{Result, RunnerError, describe_exit};
use crate::paths::RunnerPaths;
use crate::text_utils::tail_chars;

/// Prompts longer than this many characters are piped through stdin.
pub const STDIN_PROMPT_THRESHOLD: usize = 8000;

const STDERR_TAIL_CHARS: usize = 500;
const PROGRAM_LABEL: &str = "Codex";

/// Runs one `codex exec` for a request.
#[derive(Debug, Clone)]
pub struct CodexExecutor {
    binary: String,
    paths: RunnerPaths,
    credentials: Credentials,
}

impl CodexExecutor {
    pub fn new(binary: impl Into<String>, paths: RunnerPaths, credentials: Credentials) -> Self {
        Self {
            binary: binary.into(),
            paths,
            credentials,
        }
    }

    /// Check auth, patch the codex config, then run codex with the prelude.
    ///
    /// Returns the trimmed stdout, or `None` when codex printed nothing.
    pub async fn execute(&self, input: &ContainerInput, prompt: &str) -> Result<Option<String>> {
        let codex = input.codex_config();
        validate_codex_auth(
            codex.auth_method,
            &self.paths.codex_auth_file(),
            &self.credentials,
        )?;

        let settings = CodexSettings::from(codex.approval_policy.unwrap_or_default());
        ensure_codex_config(&self.paths.codex_config_file(), settings);

        let prelude = build_codex_prelude(&self.paths, input.is_main);
        self.run(&format!("{prelude}\n\n{prompt}")).await
    }

    async fn run(&self, full_prompt: &str) -> Result<Option<String>> {
        let prompt_chars = full_prompt.chars().count();
        let use_stdin = prompt_chars > STDIN_PROMPT_THRESHOLD;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("exec");
        if !use_stdin {
            cmd.arg(full_prompt);
        }
        cmd.current_dir(&self.paths.group_dir)
            .stdin(if use_stdin {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        info!(prompt_chars, use_stdin, "Spawning codex exec");
        let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            program: PROGRAM_LABEL.to_string(),
            source,
        })?;

        let stdin = child.stdin.take();
        let write_prompt = async {
            if let Some(mut stdin) = stdin
                && let Err(err) = stdin.write_all(full_prompt.as_bytes()).await
            {
                warn!("Failed to write prompt to codex stdin: {}", err);
            }
        };
        let ((), output) = tokio::join!(write_prompt, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RunnerError::Backend(format!(
                "Codex {}: {}",
                describe_exit(&output.status),
                tail_chars(stderr.trim(), STDERR_TAIL_CHARS)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let result = stdout.trim();
        Ok((!result.is_empty()).then(|| result.to_string()))
    }
}
