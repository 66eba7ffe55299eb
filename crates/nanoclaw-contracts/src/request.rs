use serde::{Deserialize, Serialize};

/// Error raised while decoding the runner input document.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("field '{0}' must not be empty")]
    EmptyField(&'static str),
}

/// Execution backend selected by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Interactive streaming agent session.
    #[default]
    Claude,
    /// One-shot `codex exec` subprocess.
    Codex,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Claude => "claude",
            Provider::Codex => "codex",
        }
    }
}

/// Approval/sandbox preset for the codex backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalPolicy {
    #[default]
    Auto,
    Readonly,
    Full,
}

/// How the codex backend is expected to authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMethod {
    #[serde(rename = "chatgpt")]
    ChatGpt,
    #[serde(rename = "api_key")]
    ApiKey,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodexConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_policy: Option<ApprovalPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_method: Option<AuthMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codex: Option<CodexConfig>,
}

/// The single request handled by one runner invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInput {
    pub prompt: String,
    /// Resume token for a previous interactive session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub group_folder: String,
    pub chat_jid: String,
    pub is_main: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_scheduled_task: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Provider>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<ProviderConfig>,
}

impl ContainerInput {
    /// Decode and validate a request document.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let input: ContainerInput = serde_json::from_str(raw)?;
        input.validate()?;
        Ok(input)
    }

    fn validate(&self) -> Result<(), InputError> {
        if self.group_folder.trim().is_empty() {
            return Err(InputError::EmptyField("groupFolder"));
        }
        if self.chat_jid.trim().is_empty() {
            return Err(InputError::EmptyField("chatJid"));
        }
        Ok(())
    }

    pub fn provider(&self) -> Provider {
        self.provider.unwrap_or_default()
    }

    pub fn is_scheduled_task(&self) -> bool {
        self.is_scheduled_task.unwrap_or(false)
    }

    pub fn codex_config(&self) -> CodexConfig {
        self.provider_config
            .as_ref()
            .and_then(|config| config.codex.clone())
            .unwrap_or_default()
    }
}
