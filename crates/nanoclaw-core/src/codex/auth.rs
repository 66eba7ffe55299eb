use std::path::Path;

use nanoclaw_contracts::AuthMethod;

use crate::config::Credentials;
use crate::error::{Result, RunnerError};

pub const CHATGPT_AUTH_MISSING: &str = "Codex auth.json not found. Run `codex login` on the host and copy ~/.codex/auth.json to data/codex/<group>/.codex/auth.json.";
pub const API_KEY_MISSING: &str =
    "OPENAI_API_KEY or CODEX_API_KEY is missing. Add one to .env to use Codex API key auth.";
pub const AUTH_MISSING: &str =
    "Codex authentication not found. Run `codex login` or set OPENAI_API_KEY in .env.";

/// Check that codex can authenticate before spawning it.
pub fn validate_codex_auth(
    method: Option<AuthMethod>,
    auth_file: &Path,
    credentials: &Credentials,
) -> Result<()> {
    let has_auth_file = auth_file.exists();
    let missing = match method {
        Some(AuthMethod::ChatGpt) if !has_auth_file => Some(CHATGPT_AUTH_MISSING),
        Some(AuthMethod::ApiKey) if !credentials.has_api_key() => Some(API_KEY_MISSING),
        None if !has_auth_file && !credentials.has_api_key() => Some(AUTH_MISSING),
        _ => None,
    };

    match missing {
        Some(message) => Err(RunnerError::Auth(message.to_string())),
        None => Ok(()),
    }
}
