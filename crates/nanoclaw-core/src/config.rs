use std::fmt;

use crate::paths::RunnerPaths;

pub const CODEX_API_KEY_ENV: &str = "CODEX_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_CLAUDE_BINARY: &str = "claude";
const DEFAULT_CODEX_BINARY: &str = "codex";
const DEFAULT_IPC_MCP_COMMAND: &str = "nanoclaw-ipc-mcp";

/// Credentials resolved once per invocation.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    api_key: Option<String>,
}

impl Credentials {
    /// `CODEX_API_KEY` wins over `OPENAI_API_KEY`; empty values count as unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = [CODEX_API_KEY_ENV, OPENAI_API_KEY_ENV]
            .into_iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.is_empty());
        Self { api_key }
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything one runner invocation needs besides the request itself.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub paths: RunnerPaths,
    pub credentials: Credentials,
    pub claude_binary: String,
    pub codex_binary: String,
    pub ipc_mcp_command: String,
    /// Command the interactive engine runs before compacting history.
    pub pre_compact_command: Option<String>,
}

impl RunnerConfig {
    pub fn container() -> Self {
        Self::new(RunnerPaths::container(), Credentials::from_env())
    }

    pub fn new(paths: RunnerPaths, credentials: Credentials) -> Self {
        Self {
            paths,
            credentials,
            claude_binary: DEFAULT_CLAUDE_BINARY.to_string(),
            codex_binary: DEFAULT_CODEX_BINARY.to_string(),
            ipc_mcp_command: DEFAULT_IPC_MCP_COMMAND.to_string(),
            pre_compact_command: None,
        }
    }

    pub fn with_codex_binary(mut self, binary: impl Into<String>) -> Self {
        self.codex_binary = binary.into();
        self
    }

    pub fn with_pre_compact_command(mut self, command: impl Into<String>) -> Self {
        self.pre_compact_command = Some(command.into());
        self
    }
}
