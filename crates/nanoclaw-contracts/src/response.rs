use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStatus {
    Success,
    Error,
}

/// Normalized result of one runner invocation.
///
/// Construct through [`ContainerOutput::success`] or [`ContainerOutput::error`]
/// so that `error` is present exactly when the status is `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOutput {
    status: OutputStatus,
    result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    new_session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ContainerOutput {
    pub fn success(result: Option<String>, new_session_id: Option<String>) -> Self {
        Self {
            status: OutputStatus::Success,
            result,
            new_session_id,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: OutputStatus::Error,
            result: None,
            new_session_id: None,
            error: Some(message.into()),
        }
    }

    /// Keep a session id observed before the failure so the host can resume it.
    pub fn with_session_id(mut self, session_id: Option<String>) -> Self {
        self.new_session_id = session_id;
        self
    }

    pub fn status(&self) -> OutputStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == OutputStatus::Success
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn new_session_id(&self) -> Option<&str> {
        self.new_session_id.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Single-line JSON rendering used on the wire.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
