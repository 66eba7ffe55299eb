//! Conversation archival before the engine compacts its history.
//!
//! The full transcript is rendered to markdown under the group's
//! `conversations/` directory as `<YYYY-MM-DD>-<title>.md`. A later archive
//! with the same date and title replaces the earlier file.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Local, NaiveDate, Utc};
use regex::Regex;
use tracing::{info, warn};

use crate::engine::{PreCompactHook, PreCompactInput};
use crate::error::Result;
use crate::session_index::session_summary;
use crate::text_utils::truncate_chars;
use crate::transcript::{ParsedMessage, Role, parse_transcript};

/// Persona name the assistant's messages are attributed to.
pub const ASSISTANT_NAME: &str = "Andy";

const DEFAULT_TITLE: &str = "Conversation";
const MAX_MESSAGE_CHARS: usize = 2000;
const MAX_FILENAME_CHARS: usize = 50;

static NON_ALPHANUMERIC_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("invalid filename regex"));

/// Lowercase slug of a session summary, at most 50 characters.
///
/// May return an empty string for punctuation-only input.
pub fn sanitize_filename(summary: &str) -> String {
    let lowered = summary.to_lowercase();
    let slug = NON_ALPHANUMERIC_RUN.replace_all(&lowered, "-");
    slug.trim_matches('-').chars().take(MAX_FILENAME_CHARS).collect()
}

pub fn fallback_name(now: &DateTime<Local>) -> String {
    format!("conversation-{}", now.format("%H%M"))
}

pub fn archive_file_name(date: NaiveDate, name: &str) -> String {
    format!("{}-{}.md", date.format("%Y-%m-%d"), name)
}

pub fn format_transcript_markdown(
    messages: &[ParsedMessage],
    title: Option<&str>,
    archived_at: &DateTime<Local>,
) -> String {
    let title = title.filter(|t| !t.is_empty()).unwrap_or(DEFAULT_TITLE);

    let mut lines = vec![
        format!("# {title}"),
        String::new(),
        format!("Archived: {}", archived_at.format("%b %-d, %-I:%M %p")),
        String::new(),
        "---".to_string(),
        String::new(),
    ];

    for message in messages {
        let sender = match message.role {
            Role::User => "User",
            Role::Assistant => ASSISTANT_NAME,
        };
        let content = truncate_chars(&message.content, MAX_MESSAGE_CHARS);
        lines.push(format!("**{sender}**: {content}"));
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Writes conversation archives into one directory.
#[derive(Debug, Clone)]
pub struct TranscriptArchiver {
    conversations_dir: PathBuf,
}

impl TranscriptArchiver {
    pub fn new(conversations_dir: impl Into<PathBuf>) -> Self {
        Self {
            conversations_dir: conversations_dir.into(),
        }
    }

    /// Archive the transcript named by `input`.
    ///
    /// Returns `Ok(None)` when there is no transcript or nothing worth archiving.
    pub fn archive(&self, input: &PreCompactInput) -> Result<Option<PathBuf>> {
        let Some(transcript_path) = input
            .transcript_path
            .as_deref()
            .filter(|path| path.exists())
        else {
            info!("No transcript found for archiving");
            return Ok(None);
        };

        let bytes = fs::read(transcript_path)?;
        let messages = parse_transcript(&String::from_utf8_lossy(&bytes));
        if messages.is_empty() {
            info!("No messages to archive");
            return Ok(None);
        }

        let summary = session_summary(&input.session_id, transcript_path);
        let now = Local::now();
        let name = summary
            .as_deref()
            .map(sanitize_filename)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| fallback_name(&now));

        fs::create_dir_all(&self.conversations_dir)?;
        let date = now.with_timezone(&Utc).date_naive();
        let path = self.conversations_dir.join(archive_file_name(date, &name));
        let markdown = format_transcript_markdown(&messages, summary.as_deref(), &now);
        fs::write(&path, markdown)?;

        info!("Archived conversation to {}", path.display());
        Ok(Some(path))
    }

    /// Archive and swallow any failure.
    pub fn run(&self, input: &PreCompactInput) {
        if let Err(err) = self.archive(input) {
            warn!("Failed to archive transcript: {}", err);
        }
    }

    pub fn into_hook(self) -> PreCompactHook {
        Arc::new(move |input: &PreCompactInput| self.run(input))
    }
}
