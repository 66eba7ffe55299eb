//! Lookup of session summaries in the engine's `sessions-index.json`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Result;

pub const SESSIONS_INDEX_FILE: &str = "sessions-index.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub full_path: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub first_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionsIndex {
    #[serde(default)]
    pub entries: Vec<SessionEntry>,
}

impl SessionsIndex {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn find(&self, session_id: &str) -> Option<&SessionEntry> {
        self.entries
            .iter()
            .find(|entry| entry.session_id.as_deref() == Some(session_id))
    }
}

/// Index file that sits next to a transcript.
pub fn index_path_for(transcript_path: &Path) -> PathBuf {
    transcript_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(SESSIONS_INDEX_FILE)
}

/// Non-empty summary recorded for `session_id`, if any.
pub fn session_summary(session_id: &str, transcript_path: &Path) -> Option<String> {
    let index_path = index_path_for(transcript_path);
    if !index_path.exists() {
        info!("Sessions index not found at {}", index_path.display());
        return None;
    }

    match SessionsIndex::load(&index_path) {
        Ok(index) => index
            .find(session_id)
            .and_then(|entry| entry.summary.clone())
            .filter(|summary| !summary.is_empty()),
        Err(err) => {
            warn!("Failed to read sessions index: {}", err);
            None
        }
    }
}
