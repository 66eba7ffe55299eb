//! Backend selection and output normalization.

use std::sync::Arc;

use futures::StreamExt;
use nanoclaw_contracts::{ContainerInput, ContainerOutput, Provider};
use tracing::{info, warn};

use crate::archive::TranscriptArchiver;
use crate::codex::CodexExecutor;
use crate::config::RunnerConfig;
use crate::engine::{
    AgentEngine, BUILTIN_TOOLS, ClaudeCliEngine, EngineMessage, EngineQuery, IpcMcp,
    IpcMcpContext,
};
use crate::error::{Result, RunnerError};
use crate::memory::{MemorySync, ensure_memory_copy};
use crate::prompt::{ReplyChannel, rewrite_prompt};

const PROJECT_SETTING_SOURCE: &str = "project";

/// Response for one request plus the exit code the process should report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub output: ContainerOutput,
    pub exit_code: i32,
}

impl DispatchOutcome {
    fn completed(output: ContainerOutput) -> Self {
        Self {
            output,
            exit_code: 0,
        }
    }

    fn failed(output: ContainerOutput) -> Self {
        Self {
            output,
            exit_code: 1,
        }
    }
}

/// What the interactive stream has produced so far.
#[derive(Debug, Default)]
struct SessionProgress {
    new_session_id: Option<String>,
    result: Option<String>,
}

/// Drives exactly one backend per request.
pub struct Dispatcher {
    config: RunnerConfig,
    engine: Arc<dyn AgentEngine>,
}

impl Dispatcher {
    pub fn new(config: RunnerConfig, engine: Arc<dyn AgentEngine>) -> Self {
        Self { config, engine }
    }

    /// Dispatcher backed by the Claude CLI for interactive sessions.
    pub fn with_claude_cli(config: RunnerConfig) -> Self {
        let engine = ClaudeCliEngine::new(config.claude_binary.clone())
            .with_hook_command(config.pre_compact_command.clone());
        Self::new(config, Arc::new(engine))
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub async fn dispatch(&self, input: &ContainerInput) -> DispatchOutcome {
        let provider = input.provider();
        info!(
            provider = provider.as_str(),
            group = %input.group_folder,
            is_main = input.is_main,
            scheduled = input.is_scheduled_task(),
            "Received input"
        );

        match provider {
            Provider::Claude => self.run_interactive(input).await,
            Provider::Codex => self.run_codex(input).await,
        }
    }

    async fn run_interactive(&self, input: &ContainerInput) -> DispatchOutcome {
        let paths = &self.config.paths;
        let sync = ensure_memory_copy(paths.global_memory(input.is_main), &paths.engine_memory);
        if sync == MemorySync::Written {
            info!("Synced global memory into {}", paths.engine_memory.display());
        }

        let ipc = IpcMcp::new(
            IpcMcpContext {
                chat_jid: input.chat_jid.clone(),
                group_folder: input.group_folder.clone(),
                is_main: input.is_main,
            },
            self.config.ipc_mcp_command.clone(),
        );
        let mut allowed_tools: Vec<String> =
            BUILTIN_TOOLS.iter().map(|tool| tool.to_string()).collect();
        allowed_tools.push(ipc.tool_pattern());

        let query = EngineQuery {
            prompt: rewrite_prompt(
                &input.prompt,
                input.is_scheduled_task(),
                ReplyChannel::McpTool,
            ),
            cwd: paths.group_dir.clone(),
            resume: input.session_id.clone(),
            allowed_tools,
            bypass_permissions: true,
            setting_sources: vec![PROJECT_SETTING_SOURCE.to_string()],
            mcp_servers: vec![ipc.server()],
            pre_compact: Some(TranscriptArchiver::new(&paths.conversations_dir).into_hook()),
        };

        let mut progress = SessionProgress::default();
        match self.consume_session(query, &mut progress).await {
            Ok(()) => {
                info!("Agent completed successfully");
                DispatchOutcome::completed(ContainerOutput::success(
                    progress.result,
                    progress.new_session_id,
                ))
            }
            Err(err) => {
                warn!("Agent error: {}", err);
                DispatchOutcome::failed(
                    ContainerOutput::error(err.to_string())
                        .with_session_id(progress.new_session_id),
                )
            }
        }
    }

    async fn consume_session(
        &self,
        query: EngineQuery,
        progress: &mut SessionProgress,
    ) -> Result<()> {
        let mut stream = self.engine.query(query).await?;
        while let Some(message) = stream.next().await {
            match message? {
                EngineMessage::Init { session_id } => {
                    if progress.new_session_id.is_none() {
                        info!(session_id = %session_id, "Session initialized");
                        progress.new_session_id = Some(session_id);
                    }
                }
                EngineMessage::Result { text, is_error } => {
                    if is_error {
                        warn!("Engine reported an error result");
                    }
                    if let Some(text) = text.filter(|text| !text.is_empty()) {
                        progress.result = Some(text);
                    }
                }
                EngineMessage::Other { .. } => {}
            }
        }
        Ok(())
    }

    async fn run_codex(&self, input: &ContainerInput) -> DispatchOutcome {
        let executor = CodexExecutor::new(
            self.config.codex_binary.clone(),
            self.config.paths.clone(),
            self.config.credentials.clone(),
        );
        let prompt = rewrite_prompt(
            &input.prompt,
            input.is_scheduled_task(),
            ReplyChannel::DropBox,
        );

        match executor.execute(input, &prompt).await {
            Ok(result) => {
                info!("Codex completed successfully");
                DispatchOutcome::completed(ContainerOutput::success(result, None))
            }
            Err(RunnerError::Auth(message)) => {
                warn!("Codex authentication missing");
                DispatchOutcome::completed(ContainerOutput::error(message))
            }
            Err(err) => {
                warn!("Codex error: {}", err);
                DispatchOutcome::failed(ContainerOutput::error(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use nanoclaw_contracts::OutputStatus;

    use crate::codex::AUTH_MISSING;
    use crate::config::Credentials;
    use crate::engine::{EngineStream, PreCompactInput};
    use crate::paths::RunnerPaths;

    enum Step {
        Message(EngineMessage),
        Fail(&'static str),
    }

    fn init(session_id: &str) -> Step {
        Step::Message(EngineMessage::Init {
            session_id: session_id.to_string(),
        })
    }

    fn result(text: Option<&str>) -> Step {
        Step::Message(EngineMessage::Result {
            text: text.map(str::to_string),
            is_error: false,
        })
    }

    #[derive(Default)]
    struct ScriptedEngine {
        steps: Mutex<Vec<Step>>,
        refuse: bool,
        compact: Option<PreCompactInput>,
        seen: Mutex<Option<EngineQuery>>,
    }

    impl ScriptedEngine {
        fn with_steps(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps),
                ..Default::default()
            }
        }

        fn seen_query(&self) -> EngineQuery {
            self.seen.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl AgentEngine for ScriptedEngine {
        async fn query(&self, query: EngineQuery) -> Result<EngineStream> {
            *self.seen.lock().unwrap() = Some(query.clone());
            if self.refuse {
                return Err(RunnerError::Engine("engine unavailable".to_string()));
            }
            if let (Some(input), Some(hook)) = (&self.compact, &query.pre_compact) {
                hook(input);
            }
            let items: Vec<Result<EngineMessage>> = std::mem::take(&mut *self.steps.lock().unwrap())
                .into_iter()
                .map(|step| match step {
                    Step::Message(message) => Ok(message),
                    Step::Fail(reason) => Err(RunnerError::Engine(reason.to_string())),
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn request(extra: &str) -> ContainerInput {
        ContainerInput::parse(&format!(
            r#"{{"prompt":"hi","groupFolder":"family","chatJid":"123@g.us","isMain":true{extra}}}"#
        ))
        .unwrap()
    }

    fn config(root: &Path) -> RunnerConfig {
        let paths = RunnerPaths::rooted(root);
        fs::create_dir_all(&paths.group_dir).unwrap();
        RunnerConfig::new(paths, Credentials::default())
    }

    fn dispatcher(root: &Path, engine: &Arc<ScriptedEngine>) -> Dispatcher {
        Dispatcher::new(config(root), engine.clone())
    }

    #[tokio::test]
    async fn test_interactive_keeps_first_session_and_latest_result() {
        let temp = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::with_steps(vec![
            init("s1"),
            Step::Message(EngineMessage::Other {
                kind: "assistant".to_string(),
            }),
            result(Some("first")),
            init("s2"),
            result(Some("final")),
            result(None),
        ]));

        let outcome = dispatcher(temp.path(), &engine)
            .dispatch(&request(""))
            .await;
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.output.status(), OutputStatus::Success);
        assert_eq!(outcome.output.result(), Some("final"));
        assert_eq!(outcome.output.new_session_id(), Some("s1"));
    }

    #[tokio::test]
    async fn test_interactive_without_result_text() {
        let temp = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::with_steps(vec![init("s1")]));

        let outcome = dispatcher(temp.path(), &engine)
            .dispatch(&request(""))
            .await;
        assert!(outcome.output.is_success());
        assert!(outcome.output.result().is_none());
        assert_eq!(outcome.output.new_session_id(), Some("s1"));
    }

    #[tokio::test]
    async fn test_interactive_query_options() {
        let temp = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::default());
        let dispatcher = dispatcher(temp.path(), &engine);

        dispatcher
            .dispatch(&request(r#","sessionId":"prev","isScheduledTask":true"#))
            .await;

        let query = engine.seen_query();
        assert_eq!(query.cwd, dispatcher.config().paths.group_dir);
        assert_eq!(query.resume.as_deref(), Some("prev"));
        assert!(query.bypass_permissions);
        assert_eq!(query.setting_sources, vec!["project".to_string()]);
        assert!(query.allowed_tools.contains(&"Bash".to_string()));
        assert!(query.allowed_tools.contains(&"WebFetch".to_string()));
        assert_eq!(query.allowed_tools.last().map(String::as_str), Some("mcp__nanoclaw__*"));
        assert!(query.prompt.contains("mcp__nanoclaw__send_message"));
        assert!(query.prompt.ends_with("\n\nhi"));
        assert!(query.pre_compact.is_some());

        let server = &query.mcp_servers[0];
        assert_eq!(server.name, "nanoclaw");
        assert_eq!(server.env.get("NANOCLAW_CHAT_JID").map(String::as_str), Some("123@g.us"));
        assert_eq!(server.env.get("NANOCLAW_GROUP_FOLDER").map(String::as_str), Some("family"));
        assert_eq!(server.env.get("NANOCLAW_IS_MAIN").map(String::as_str), Some("1"));
    }

    #[tokio::test]
    async fn test_interactive_stream_error_surfaces_session() {
        let temp = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::with_steps(vec![
            init("s1"),
            result(Some("partial")),
            Step::Fail("stream broke"),
            result(Some("never seen")),
        ]));

        let outcome = dispatcher(temp.path(), &engine)
            .dispatch(&request(""))
            .await;
        assert_eq!(outcome.exit_code, 1);
        assert_eq!(outcome.output.status(), OutputStatus::Error);
        assert_eq!(outcome.output.error_message(), Some("stream broke"));
        assert!(outcome.output.result().is_none());
        assert_eq!(outcome.output.new_session_id(), Some("s1"));
    }

    #[tokio::test]
    async fn test_interactive_start_failure() {
        let temp = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine {
            refuse: true,
            ..Default::default()
        });

        let outcome = dispatcher(temp.path(), &engine)
            .dispatch(&request(""))
            .await;
        assert_eq!(outcome.exit_code, 1);
        assert_eq!(outcome.output.error_message(), Some("engine unavailable"));
        assert!(outcome.output.new_session_id().is_none());
    }

    #[tokio::test]
    async fn test_interactive_syncs_global_memory() {
        let temp = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::default());
        let dispatcher = dispatcher(temp.path(), &engine);
        let paths = &dispatcher.config().paths;
        fs::create_dir_all(paths.shared_global_memory.parent().unwrap()).unwrap();
        fs::write(&paths.shared_global_memory, "shared facts").unwrap();

        dispatcher.dispatch(&request("")).await;
        assert!(!paths.engine_memory.exists());

        let mut non_main = request("");
        non_main.is_main = false;
        dispatcher.dispatch(&non_main).await;
        assert_eq!(fs::read_to_string(&paths.engine_memory).unwrap(), "shared facts");
    }

    #[tokio::test]
    async fn test_pre_compact_hook_archives_transcript() {
        let temp = tempfile::tempdir().unwrap();
        let transcript = temp.path().join("s1.jsonl");
        fs::write(
            &transcript,
            concat!(
                r#"{"type":"user","message":{"content":"remind me tomorrow"}}"#,
                "\n",
                r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Will do."}]}}"#,
                "\n",
            ),
        )
        .unwrap();
        let engine = Arc::new(ScriptedEngine {
            compact: Some(PreCompactInput {
                session_id: "s1".to_string(),
                transcript_path: Some(transcript),
            }),
            ..Default::default()
        });
        let dispatcher = dispatcher(temp.path(), &engine);

        let outcome = dispatcher.dispatch(&request("")).await;
        assert!(outcome.output.is_success());

        let archived: Vec<_> = fs::read_dir(&dispatcher.config().paths.conversations_dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(archived.len(), 1);
        let markdown = fs::read_to_string(&archived[0]).unwrap();
        assert!(markdown.contains("**User**: remind me tomorrow"));
        assert!(markdown.contains("**Andy**: Will do."));
    }

    #[tokio::test]
    async fn test_codex_without_credentials_reports_auth_error() {
        let temp = tempfile::tempdir().unwrap();
        let engine = Arc::new(ScriptedEngine::default());
        let dispatcher = Dispatcher::new(
            config(temp.path()).with_codex_binary(temp.path().join("missing-codex").to_string_lossy()),
            engine.clone(),
        );

        let outcome = dispatcher
            .dispatch(&request(
                r#","provider":"codex","providerConfig":{"codex":{"approvalPolicy":"readonly"}}"#,
            ))
            .await;
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.output.status(), OutputStatus::Error);
        assert!(outcome.output.result().is_none());
        assert_eq!(outcome.output.error_message(), Some(AUTH_MISSING));
        assert!(engine.seen.lock().unwrap().is_none());
    }

    #[cfg(unix)]
    fn fake_codex(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-codex");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    fn codex_dispatcher(root: &Path, body: &str) -> Dispatcher {
        let mut config = config(root).with_codex_binary(fake_codex(root, body));
        config.credentials = Credentials::with_api_key("sk-test");
        Dispatcher::new(config, Arc::new(ScriptedEngine::default()))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_codex_success_has_no_session() {
        let temp = tempfile::tempdir().unwrap();
        let dispatcher = codex_dispatcher(temp.path(), "echo '  done  '");

        let outcome = dispatcher
            .dispatch(&request(r#","provider":"codex""#))
            .await;
        assert_eq!(outcome.exit_code, 0);
        assert_eq!(outcome.output.result(), Some("done"));
        assert!(outcome.output.new_session_id().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_codex_scheduled_prompt_uses_drop_box() {
        let temp = tempfile::tempdir().unwrap();
        let dispatcher = codex_dispatcher(temp.path(), r#"printf '%s' "$2""#);

        let outcome = dispatcher
            .dispatch(&request(r#","provider":"codex","isScheduledTask":true"#))
            .await;
        let prompt = outcome.output.result().unwrap();
        assert!(prompt.contains("To reply, write a JSON file to /workspace/ipc/messages.]\n\nhi"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_codex_failure_exits_nonzero() {
        let temp = tempfile::tempdir().unwrap();
        let dispatcher = codex_dispatcher(temp.path(), "echo 'boom' >&2\nexit 3");

        let outcome = dispatcher
            .dispatch(&request(r#","provider":"codex""#))
            .await;
        assert_eq!(outcome.exit_code, 1);
        assert_eq!(
            outcome.output.error_message(),
            Some("Codex exited with code 3: boom")
        );
    }
}
