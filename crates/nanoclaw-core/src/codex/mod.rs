//! One-shot `codex exec` backend.

pub mod auth;
pub mod config_toml;
pub mod exec;
pub mod prelude;

pub use auth::{API_KEY_MISSING, AUTH_MISSING, CHATGPT_AUTH_MISSING, validate_codex_auth};
pub use config_toml::{CodexSettings, ConfigUpdate, ensure_codex_config, upsert_key};
pub use exec::{CodexExecutor, STDIN_PROMPT_THRESHOLD};
pub use prelude::build_codex_prelude;
