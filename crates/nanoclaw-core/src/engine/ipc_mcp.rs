//! Descriptor for the NanoClaw IPC MCP server.
//!
//! The server's tools live in a separate program; the runner only passes it
//! the conversation context it needs.

use std::collections::BTreeMap;

use super::McpServer;

pub const IPC_MCP_SERVER_NAME: &str = "nanoclaw";

pub const CHAT_JID_ENV: &str = "NANOCLAW_CHAT_JID";
pub const GROUP_FOLDER_ENV: &str = "NANOCLAW_GROUP_FOLDER";
pub const IS_MAIN_ENV: &str = "NANOCLAW_IS_MAIN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcMcpContext {
    pub chat_jid: String,
    pub group_folder: String,
    pub is_main: bool,
}

#[derive(Debug, Clone)]
pub struct IpcMcp {
    context: IpcMcpContext,
    command: String,
}

impl IpcMcp {
    pub fn new(context: IpcMcpContext, command: impl Into<String>) -> Self {
        Self {
            context,
            command: command.into(),
        }
    }

    /// Allow-list pattern covering every tool the server exposes.
    pub fn tool_pattern(&self) -> String {
        format!("mcp__{}__*", IPC_MCP_SERVER_NAME)
    }

    pub fn server(&self) -> McpServer {
        let mut env = BTreeMap::new();
        env.insert(CHAT_JID_ENV.to_string(), self.context.chat_jid.clone());
        env.insert(GROUP_FOLDER_ENV.to_string(), self.context.group_folder.clone());
        env.insert(
            IS_MAIN_ENV.to_string(),
            if self.context.is_main { "1" } else { "0" }.to_string(),
        );
        McpServer {
            name: IPC_MCP_SERVER_NAME.to_string(),
            command: self.command.clone(),
            args: Vec::new(),
            env,
        }
    }
}
