//! Idempotent patching of codex's `config.toml`.
//!
//! Only `approval_policy` and `sandbox_mode` are managed; every other line is
//! left as it was.

use std::fs;
use std::path::Path;

use nanoclaw_contracts::ApprovalPolicy;
use regex::{NoExpand, Regex};
use tracing::{debug, warn};

use crate::error::Result;

pub const APPROVAL_POLICY_KEY: &str = "approval_policy";
pub const SANDBOX_MODE_KEY: &str = "sandbox_mode";

/// Values written for the two managed keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodexSettings {
    pub approval_policy: &'static str,
    pub sandbox_mode: &'static str,
}

impl From<ApprovalPolicy> for CodexSettings {
    fn from(policy: ApprovalPolicy) -> Self {
        match policy {
            ApprovalPolicy::Readonly => Self {
                approval_policy: "never",
                sandbox_mode: "read-only",
            },
            ApprovalPolicy::Full => Self {
                approval_policy: "never",
                sandbox_mode: "danger-full-access",
            },
            ApprovalPolicy::Auto => Self {
                approval_policy: "on-request",
                sandbox_mode: "workspace-write",
            },
        }
    }
}

impl CodexSettings {
    /// Minimal document holding just the managed keys.
    pub fn minimal_document(&self) -> String {
        format!(
            "{APPROVAL_POLICY_KEY} = \"{}\"\n{SANDBOX_MODE_KEY} = \"{}\"\n",
            self.approval_policy, self.sandbox_mode
        )
    }

    pub fn apply(&self, contents: &str) -> Result<String> {
        let patched = upsert_key(contents, APPROVAL_POLICY_KEY, self.approval_policy)?;
        upsert_key(&patched, SANDBOX_MODE_KEY, self.sandbox_mode)
    }
}

/// Replace the first `key = "..."` line, or append one.
pub fn upsert_key(contents: &str, key: &str, value: &str) -> Result<String> {
    let line = format!("{key} = \"{value}\"");
    let pattern = format!(r#"(?mR)^[ \t]*{}[ \t]*=[ \t]*".*"[ \t]*$"#, regex::escape(key));
    let re = Regex::new(&pattern)?;

    if re.is_match(contents) {
        return Ok(re.replace(contents, NoExpand(&line)).into_owned());
    }

    let trimmed = contents.trim_end();
    let separator = if trimmed.is_empty() { "" } else { "\n" };
    Ok(format!("{trimmed}{separator}{line}\n"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigUpdate {
    Unchanged,
    Written,
    /// Patching failed and the file was replaced by the minimal document.
    Replaced,
    Failed,
}

/// Bring `config_path` in line with `settings`.
///
/// If reading or patching fails the file is overwritten with
/// [`CodexSettings::minimal_document`], discarding anything else it held.
pub fn ensure_codex_config(config_path: &Path, settings: CodexSettings) -> ConfigUpdate {
    match patch_config(config_path, settings) {
        Ok(update) => update,
        Err(err) => {
            warn!("Failed to update Codex config: {}", err);
            match fs::write(config_path, settings.minimal_document()) {
                Ok(()) => ConfigUpdate::Replaced,
                Err(err) => {
                    warn!("Failed to write fallback Codex config: {}", err);
                    ConfigUpdate::Failed
                }
            }
        }
    }
}

fn patch_config(config_path: &Path, settings: CodexSettings) -> Result<ConfigUpdate> {
    if let Some(dir) = config_path.parent() {
        fs::create_dir_all(dir)?;
    }

    let existing = if config_path.exists() {
        fs::read_to_string(config_path)?
    } else {
        String::new()
    };

    let updated = settings.apply(&existing)?;
    if updated == existing {
        return Ok(ConfigUpdate::Unchanged);
    }

    fs::write(config_path, &updated)?;
    debug!("Updated Codex config at {}", config_path.display());
    Ok(ConfigUpdate::Written)
}
