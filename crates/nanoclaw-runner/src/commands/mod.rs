pub mod hook;
pub mod run;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;

/// Read stdin to end-of-stream as UTF-8.
async fn read_stdin() -> Result<String> {
    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .context("Failed to read stdin")?;
    Ok(raw)
}
