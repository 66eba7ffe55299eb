//! Long-term memory files shared between the host and the backends.

use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;

/// Outcome of [`ensure_memory_copy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemorySync {
    SourceMissing,
    Unchanged,
    Written,
    Failed,
}

/// Trimmed content of `path`, or `None` when it is absent or unreadable.
pub fn read_file_if_exists(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    match fs::read_to_string(path) {
        Ok(content) => Some(content.trim().to_string()),
        Err(err) => {
            warn!("Failed to read file {}: {}", path.display(), err);
            None
        }
    }
}

/// Copy `source` over `target` unless the target already holds the same bytes.
pub fn ensure_memory_copy(source: &Path, target: &Path) -> MemorySync {
    match sync_memory(source, target) {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!("Failed to prepare global memory file: {}", err);
            MemorySync::Failed
        }
    }
}

fn sync_memory(source: &Path, target: &Path) -> Result<MemorySync> {
    if !source.exists() {
        return Ok(MemorySync::SourceMissing);
    }

    let content = fs::read(source)?;
    if target.exists() && fs::read(target)? == content {
        return Ok(MemorySync::Unchanged);
    }

    fs::write(target, &content)?;
    debug!("Copied {} to {}", source.display(), target.display());
    Ok(MemorySync::Written)
}
