//! Interactive engine backed by the Claude Code CLI in stream-json mode.

use std::process::Stdio;

use async_stream::try_stream;
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{AgentEngine, EngineMessage, EngineQuery, EngineStream, McpServer};
use crate::error::{Result, RunnerError, describe_exit};
use crate::text_utils::tail_chars;

const STDERR_TAIL_CHARS: usize = 500;

/// Runs `claude -p` and maps its stream-json output onto [`EngineMessage`]s.
///
/// The CLI cannot call back into this process, so a registered pre-compact
/// hook is forwarded as a `PreCompact` command hook that re-enters the runner
/// through `hook_command`.
#[derive(Debug, Clone)]
pub struct ClaudeCliEngine {
    binary: String,
    hook_command: Option<String>,
}

impl ClaudeCliEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            hook_command: None,
        }
    }

    pub fn with_hook_command(mut self, command: Option<String>) -> Self {
        self.hook_command = command;
        self
    }

    /// Command-line arguments for one query. The prompt goes to stdin.
    pub fn build_args(&self, query: &EngineQuery) -> Vec<String> {
        let mut args: Vec<String> = ["-p", "--output-format", "stream-json", "--verbose"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        if query.bypass_permissions {
            args.push("--permission-mode".to_string());
            args.push("bypassPermissions".to_string());
            args.push("--dangerously-skip-permissions".to_string());
        }
        if !query.setting_sources.is_empty() {
            args.push("--setting-sources".to_string());
            args.push(query.setting_sources.join(","));
        }
        if !query.allowed_tools.is_empty() {
            args.push("--allowedTools".to_string());
            args.push(query.allowed_tools.join(","));
        }
        if !query.mcp_servers.is_empty() {
            args.push("--mcp-config".to_string());
            args.push(mcp_config_json(&query.mcp_servers).to_string());
        }
        if let Some(resume) = &query.resume {
            args.push("--resume".to_string());
            args.push(resume.clone());
        }
        if query.pre_compact.is_some() {
            match &self.hook_command {
                Some(command) => {
                    args.push("--settings".to_string());
                    args.push(pre_compact_settings_json(command).to_string());
                }
                None => warn!("Pre-compact hook registered without a hook command; archival disabled"),
            }
        }

        args
    }
}

fn mcp_config_json(servers: &[McpServer]) -> Value {
    let mut entries = Map::new();
    for server in servers {
        entries.insert(
            server.name.clone(),
            json!({
                "type": "stdio",
                "command": server.command,
                "args": server.args,
                "env": server.env,
            }),
        );
    }
    json!({ "mcpServers": entries })
}

fn pre_compact_settings_json(command: &str) -> Value {
    json!({
        "hooks": {
            "PreCompact": [
                { "hooks": [ { "type": "command", "command": command } ] }
            ]
        }
    })
}

/// Map one stream-json line onto an engine message.
pub fn parse_stream_line(line: &str) -> Option<EngineMessage> {
    let value: Value = serde_json::from_str(line).ok()?;
    let kind = value.get("type")?.as_str()?;
    let message = match kind {
        "system" if value.get("subtype").and_then(Value::as_str) == Some("init") => {
            EngineMessage::Init {
                session_id: value.get("session_id")?.as_str()?.to_string(),
            }
        }
        "result" => EngineMessage::Result {
            text: value
                .get("result")
                .and_then(Value::as_str)
                .map(str::to_string),
            is_error: value
                .get("is_error")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        },
        other => EngineMessage::Other {
            kind: other.to_string(),
        },
    };
    Some(message)
}

#[async_trait]
impl AgentEngine for ClaudeCliEngine {
    async fn query(&self, query: EngineQuery) -> Result<EngineStream> {
        let args = self.build_args(&query);
        info!(
            binary = %self.binary,
            resume = query.resume.as_deref().unwrap_or("none"),
            "Starting interactive engine"
        );

        let mut child = Command::new(&self.binary)
            .args(&args)
            .current_dir(&query.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: self.binary.clone(),
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RunnerError::Engine("Failed to capture engine stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::Engine("Failed to capture engine stdout".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::Engine("Failed to capture engine stderr".to_string()))?;

        let prompt = query.prompt;
        tokio::spawn(async move {
            if let Err(err) = stdin.write_all(prompt.as_bytes()).await {
                warn!("Failed to write prompt to engine: {}", err);
            }
        });

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Err(err) = stderr.read_to_end(&mut buf).await {
                debug!("Error reading engine stderr: {}", err);
            }
            String::from_utf8_lossy(&buf).into_owned()
        });

        let stream: EngineStream = Box::pin(try_stream! {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await.map_err(RunnerError::from)? {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match parse_stream_line(trimmed) {
                    Some(message) => {
                        yield message;
                    }
                    None => debug!("Skipping unparsable engine line"),
                }
            }

            let status = child.wait().await.map_err(RunnerError::from)?;
            let stderr_output = stderr_task.await.unwrap_or_default();
            if !status.success() {
                Err::<(), RunnerError>(RunnerError::Engine(format!(
                    "Claude CLI {}: {}",
                    describe_exit(&status),
                    tail_chars(stderr_output.trim(), STDERR_TAIL_CHARS)
                )))?;
            }
        });

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Arc;

    use futures::StreamExt;

    fn query() -> EngineQuery {
        EngineQuery {
            prompt: "hello".to_string(),
            cwd: PathBuf::from("/workspace/group"),
            resume: None,
            allowed_tools: vec!["Bash".to_string(), "mcp__nanoclaw__*".to_string()],
            bypass_permissions: true,
            setting_sources: vec!["project".to_string()],
            mcp_servers: vec![McpServer {
                name: "nanoclaw".to_string(),
                command: "nanoclaw-ipc-mcp".to_string(),
                args: Vec::new(),
                env: BTreeMap::from([("NANOCLAW_IS_MAIN".to_string(), "1".to_string())]),
            }],
            pre_compact: None,
        }
    }

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|idx| args.get(idx + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_build_args_streaming_and_permissions() {
        let args = ClaudeCliEngine::new("claude").build_args(&query());
        assert_eq!(&args[..4], ["-p", "--output-format", "stream-json", "--verbose"]);
        assert_eq!(arg_after(&args, "--permission-mode"), Some("bypassPermissions"));
        assert!(args.contains(&"--dangerously-skip-permissions".to_string()));
        assert_eq!(arg_after(&args, "--setting-sources"), Some("project"));
        assert_eq!(arg_after(&args, "--allowedTools"), Some("Bash,mcp__nanoclaw__*"));
        assert!(!args.contains(&"--resume".to_string()));
        assert!(!args.contains(&"hello".to_string()));
    }

    #[test]
    fn test_build_args_mcp_config_json() {
        let args = ClaudeCliEngine::new("claude").build_args(&query());
        let config: Value = serde_json::from_str(arg_after(&args, "--mcp-config").unwrap()).unwrap();
        assert_eq!(config["mcpServers"]["nanoclaw"]["command"], "nanoclaw-ipc-mcp");
        assert_eq!(config["mcpServers"]["nanoclaw"]["env"]["NANOCLAW_IS_MAIN"], "1");
    }

    #[test]
    fn test_build_args_resume() {
        let mut q = query();
        q.resume = Some("sess-1".to_string());
        let args = ClaudeCliEngine::new("claude").build_args(&q);
        assert_eq!(arg_after(&args, "--resume"), Some("sess-1"));
    }

    #[test]
    fn test_build_args_registers_pre_compact_command_hook() {
        let mut q = query();
        q.pre_compact = Some(Arc::new(|_| {}));
        let engine = ClaudeCliEngine::new("claude")
            .with_hook_command(Some("/usr/local/bin/agent-runner hook pre-compact".to_string()));
        let args = engine.build_args(&q);
        let settings: Value = serde_json::from_str(arg_after(&args, "--settings").unwrap()).unwrap();
        assert_eq!(
            settings["hooks"]["PreCompact"][0]["hooks"][0]["command"],
            "/usr/local/bin/agent-runner hook pre-compact"
        );
    }

    #[test]
    fn test_build_args_without_hook_command_skips_settings() {
        let mut q = query();
        q.pre_compact = Some(Arc::new(|_| {}));
        let args = ClaudeCliEngine::new("claude").build_args(&q);
        assert!(!args.contains(&"--settings".to_string()));
    }

    #[test]
    fn test_parse_stream_line_init_and_result() {
        assert_eq!(
            parse_stream_line(r#"{"type":"system","subtype":"init","session_id":"abc"}"#),
            Some(EngineMessage::Init {
                session_id: "abc".to_string()
            })
        );
        assert_eq!(
            parse_stream_line(r#"{"type":"result","subtype":"success","result":"Hi!","is_error":false}"#),
            Some(EngineMessage::Result {
                text: Some("Hi!".to_string()),
                is_error: false
            })
        );
        assert_eq!(
            parse_stream_line(r#"{"type":"assistant","message":{}}"#),
            Some(EngineMessage::Other {
                kind: "assistant".to_string()
            })
        );
        assert_eq!(parse_stream_line("garbage"), None);
        assert_eq!(parse_stream_line(r#"{"subtype":"init"}"#), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_query_streams_messages_from_process() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let script = temp.path().join("fake-claude");
        std::fs::write(
            &script,
            "#!/bin/sh\ncat > /dev/null\n\
             echo '{\"type\":\"system\",\"subtype\":\"init\",\"session_id\":\"s-42\"}'\n\
             echo 'noise'\n\
             echo '{\"type\":\"result\",\"result\":\"done\"}'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut q = query();
        q.cwd = temp.path().to_path_buf();
        let engine = ClaudeCliEngine::new(script.to_string_lossy());
        let messages: Vec<EngineMessage> = engine
            .query(q)
            .await
            .unwrap()
            .map(|m| m.unwrap())
            .collect()
            .await;

        assert_eq!(
            messages,
            vec![
                EngineMessage::Init {
                    session_id: "s-42".to_string()
                },
                EngineMessage::Result {
                    text: Some("done".to_string()),
                    is_error: false
                },
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_query_reports_nonzero_exit_as_stream_error() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let script = temp.path().join("fake-claude");
        std::fs::write(&script, "#!/bin/sh\ncat > /dev/null\necho 'auth failed' >&2\nexit 3\n")
            .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut q = query();
        q.cwd = temp.path().to_path_buf();
        let engine = ClaudeCliEngine::new(script.to_string_lossy());
        let results: Vec<Result<EngineMessage>> = engine.query(q).await.unwrap().collect().await;

        assert_eq!(results.len(), 1);
        let err = results.into_iter().next().unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Claude CLI exited with code 3: auth failed");
    }

    #[tokio::test]
    async fn test_query_missing_binary_is_spawn_error() {
        let mut q = query();
        q.cwd = std::env::temp_dir();
        let engine = ClaudeCliEngine::new("/nonexistent/claude-binary");
        let err = engine.query(q).await.err().unwrap();
        assert!(matches!(err, RunnerError::Spawn { .. }));
    }
}
