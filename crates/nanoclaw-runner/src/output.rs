use std::io::Write;

use anyhow::{Context, Result};
use nanoclaw_contracts::{ContainerOutput, frame_output};

/// Write the framed response to stdout.
pub fn emit(output: &ContainerOutput) -> Result<()> {
    let framed = frame_output(output).context("Failed to serialize output")?;
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(framed.as_bytes())
        .context("Failed to write output")?;
    stdout.flush().context("Failed to flush output")?;
    Ok(())
}
