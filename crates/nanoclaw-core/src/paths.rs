use std::path::{Path, PathBuf};

const CONTAINER_WORKSPACE_DIR: &str = "/workspace";
const CONTAINER_CODEX_HOME: &str = "/home/node/.codex";

const MEMORY_FILE: &str = "CLAUDE.md";
const CONVERSATIONS_DIR: &str = "conversations";
const CODEX_CONFIG_FILE: &str = "config.toml";
const CODEX_AUTH_FILE: &str = "auth.json";

/// Filesystem layout the runner reads and writes inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerPaths {
    /// Working directory of both backends.
    pub group_dir: PathBuf,
    pub group_memory: PathBuf,
    /// Global memory as mounted for the main group (read-write project checkout).
    pub main_global_memory: PathBuf,
    /// Global memory as mounted for every other group (read-only).
    pub shared_global_memory: PathBuf,
    /// Where the interactive engine looks for user-level memory.
    pub engine_memory: PathBuf,
    pub conversations_dir: PathBuf,
    pub ipc_messages_dir: PathBuf,
    pub ipc_tasks_dir: PathBuf,
    pub codex_home: PathBuf,
}

impl RunnerPaths {
    /// Fixed container layout.
    pub fn container() -> Self {
        Self::layout(
            Path::new(CONTAINER_WORKSPACE_DIR),
            Path::new(CONTAINER_CODEX_HOME),
        )
    }

    /// Same layout rebased under `root`.
    pub fn rooted(root: &Path) -> Self {
        Self::layout(
            &root.join("workspace"),
            &root.join("home").join("node").join(".codex"),
        )
    }

    fn layout(workspace: &Path, codex_home: &Path) -> Self {
        let group_dir = workspace.join("group");
        let ipc_dir = workspace.join("ipc");
        Self {
            group_memory: group_dir.join(MEMORY_FILE),
            conversations_dir: group_dir.join(CONVERSATIONS_DIR),
            main_global_memory: workspace
                .join("project")
                .join("groups")
                .join("global")
                .join(MEMORY_FILE),
            shared_global_memory: workspace.join("global").join(MEMORY_FILE),
            engine_memory: workspace.join(MEMORY_FILE),
            ipc_messages_dir: ipc_dir.join("messages"),
            ipc_tasks_dir: ipc_dir.join("tasks"),
            group_dir,
            codex_home: codex_home.to_path_buf(),
        }
    }

    /// Global memory location visible to this group.
    pub fn global_memory(&self, is_main: bool) -> &Path {
        if is_main {
            &self.main_global_memory
        } else {
            &self.shared_global_memory
        }
    }

    pub fn codex_config_file(&self) -> PathBuf {
        self.codex_home.join(CODEX_CONFIG_FILE)
    }

    pub fn codex_auth_file(&self) -> PathBuf {
        self.codex_home.join(CODEX_AUTH_FILE)
    }
}
