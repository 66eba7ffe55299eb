//! Instructions prepended to every codex prompt.
//!
//! Codex has no MCP bridge to the host, so messaging and scheduling go through
//! JSON drop-box directories watched by the host.

use crate::memory::read_file_if_exists;
use crate::paths::RunnerPaths;

const MESSAGE_EXAMPLE: &str = r#"{"type":"message","chatJid":"<jid>","text":"hello"}"#;
const TASK_EXAMPLE: &str = r#"{"type":"schedule_task","prompt":"...","schedule_type":"cron","schedule_value":"0 9 * * 1","groupFolder":"<group-folder>","context_mode":"isolated"}"#;

pub fn build_codex_prelude(paths: &RunnerPaths, is_main: bool) -> String {
    let mut lines: Vec<String> = vec![
        "You are NanoClaw, an assistant operating in WhatsApp.".into(),
        "Respond with plain text only.".into(),
        String::new(),
        "## Tools (Filesystem IPC)".into(),
        format!(
            "To send a message, write a JSON file to `{}/`.",
            paths.ipc_messages_dir.display()
        ),
        format!("Example: {MESSAGE_EXAMPLE}"),
        format!(
            "To schedule tasks, write a JSON file to `{}/`.",
            paths.ipc_tasks_dir.display()
        ),
        format!("Example: {TASK_EXAMPLE}"),
        String::new(),
        "## Skills".into(),
        "If the user asks for `/setup`, treat it as a request to run the `$setup` skill.".into(),
        String::new(),
        "## Memory".into(),
    ];

    let global_memory =
        read_file_if_exists(paths.global_memory(is_main)).filter(|content| !content.is_empty());
    let group_memory =
        read_file_if_exists(&paths.group_memory).filter(|content| !content.is_empty());

    if let Some(global) = &global_memory {
        lines.push("### Global Memory".into());
        lines.push(global.clone());
        lines.push(String::new());
    }
    if let Some(group) = &group_memory {
        lines.push("### Group Memory".into());
        lines.push(group.clone());
        lines.push(String::new());
    }
    if global_memory.is_none() && group_memory.is_none() {
        lines.push("No memory files found.".into());
        lines.push(String::new());
    }

    lines.push("## Memory Updates".into());
    lines.push(format!(
        "If the user says \"remember this\", update `{}`.",
        paths.group_memory.display()
    ));
    if is_main {
        lines.push(format!(
            "If the user says \"remember this globally\", update `{}`.",
            paths.main_global_memory.display()
        ));
    } else {
        lines.push("Never write to global memory in non-main groups.".into());
    }

    lines.join("\n")
}
