//! Prompt rewriting shared by both backends.

const INTERACTIVE_SCHEDULED_PREFIX: &str = "[SCHEDULED TASK - You are running automatically, not in response to a user message. Use mcp__nanoclaw__send_message if needed to communicate with the user.]";
const CODEX_SCHEDULED_PREFIX: &str = "[SCHEDULED TASK - You are running automatically, not in response to a user message. To reply, write a JSON file to /workspace/ipc/messages.]";

/// How the agent reaches the user when nobody is waiting for a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyChannel {
    /// Through the `send_message` tool of the IPC MCP server.
    McpTool,
    /// Through the JSON drop-box directory.
    DropBox,
}

impl ReplyChannel {
    fn scheduled_prefix(self) -> &'static str {
        match self {
            Self::McpTool => INTERACTIVE_SCHEDULED_PREFIX,
            Self::DropBox => CODEX_SCHEDULED_PREFIX,
        }
    }
}

/// Prepend the unattended-run notice for scheduled tasks.
pub fn rewrite_prompt(prompt: &str, is_scheduled_task: bool, channel: ReplyChannel) -> String {
    if is_scheduled_task {
        format!("{}\n\n{}", channel.scheduled_prefix(), prompt)
    } else {
        prompt.to_string()
    }
}
