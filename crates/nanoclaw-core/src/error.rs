//! Error types for the runner core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Engine(String),

    #[error("{0}")]
    Auth(String),

    #[error("{0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, RunnerError>;

/// How a failed child process ended, e.g. `exited with code 2`.
pub fn describe_exit(status: &std::process::ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exited with code {code}"),
        None => format!("was terminated ({status})"),
    }
}
