//! Interactive agent engine seam.
//!
//! The engine itself is an external program; the runner only drives it with an
//! [`EngineQuery`] and consumes the resulting [`EngineMessage`] stream.

pub mod claude_cli;
pub mod ipc_mcp;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use serde::Deserialize;

use crate::error::Result;

pub use claude_cli::ClaudeCliEngine;
pub use ipc_mcp::{IpcMcp, IpcMcpContext};

/// Generic file, shell and web tools granted to every session.
pub const BUILTIN_TOOLS: &[&str] = &[
    "Bash",
    "Read",
    "Write",
    "Edit",
    "Glob",
    "Grep",
    "WebSearch",
    "WebFetch",
];

/// Typed message observed on the engine's output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMessage {
    /// Session initialization; carries the id to resume later.
    Init { session_id: String },
    /// Final output of a turn.
    Result { text: Option<String>, is_error: bool },
    Other { kind: String },
}

pub type EngineStream = Pin<Box<dyn Stream<Item = Result<EngineMessage>> + Send>>;

/// Payload handed to the pre-compaction hook.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreCompactInput {
    pub session_id: String,
    #[serde(default)]
    pub transcript_path: Option<PathBuf>,
}

/// Blocking callback fired before the engine compacts older history.
///
/// Implementations must swallow their own failures.
pub type PreCompactHook = Arc<dyn Fn(&PreCompactInput) + Send + Sync>;

/// Stdio MCP server made available to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpServer {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// Options for starting one engine session.
#[derive(Clone)]
pub struct EngineQuery {
    pub prompt: String,
    pub cwd: PathBuf,
    pub resume: Option<String>,
    pub allowed_tools: Vec<String>,
    pub bypass_permissions: bool,
    pub setting_sources: Vec<String>,
    pub mcp_servers: Vec<McpServer>,
    /// Called in-process by engines that run inside the runner. Subprocess
    /// engines such as [`ClaudeCliEngine`] only read it as a flag and run
    /// their configured hook command instead.
    pub pre_compact: Option<PreCompactHook>,
}

impl fmt::Debug for EngineQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineQuery")
            .field("prompt_len", &self.prompt.len())
            .field("cwd", &self.cwd)
            .field("resume", &self.resume)
            .field("allowed_tools", &self.allowed_tools)
            .field("bypass_permissions", &self.bypass_permissions)
            .field("setting_sources", &self.setting_sources)
            .field("mcp_servers", &self.mcp_servers)
            .field("pre_compact", &self.pre_compact.is_some())
            .finish()
    }
}

/// An interactive engine producing a finite, non-restartable message stream.
#[async_trait]
pub trait AgentEngine: Send + Sync {
    async fn query(&self, query: EngineQuery) -> Result<EngineStream>;
}
