//! Core of the NanoClaw container agent runner.
//!
//! One [`ContainerInput`](nanoclaw_contracts::ContainerInput) is dispatched to
//! either the interactive engine or the one-shot codex subprocess, and the
//! outcome is normalized into a [`ContainerOutput`](nanoclaw_contracts::ContainerOutput).

pub mod archive;
pub mod codex;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod memory;
pub mod paths;
pub mod prompt;
pub mod session_index;
pub mod text_utils;
pub mod transcript;

pub use config::{Credentials, RunnerConfig};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::{Result, RunnerError};
pub use paths::RunnerPaths;
