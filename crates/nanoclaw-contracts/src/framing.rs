//! Sentinel framing of the runner output on stdout.
//!
//! Anything outside the two marker lines is noise from the container and must
//! be ignored by the host.

use crate::response::ContainerOutput;

pub const OUTPUT_START_MARKER: &str = "---NANOCLAW_OUTPUT_START---";
pub const OUTPUT_END_MARKER: &str = "---NANOCLAW_OUTPUT_END---";

/// Render the framed block: start marker, one JSON line, end marker.
pub fn frame_output(output: &ContainerOutput) -> serde_json::Result<String> {
    let json = output.to_json_line()?;
    Ok(format!("{OUTPUT_START_MARKER}\n{json}\n{OUTPUT_END_MARKER}\n"))
}

/// Extract the payload between the first start marker and the following end marker.
pub fn extract_framed_output(stdout: &str) -> Option<&str> {
    let start = stdout.find(OUTPUT_START_MARKER)? + OUTPUT_START_MARKER.len();
    let rest = &stdout[start..];
    let end = rest.find(OUTPUT_END_MARKER)?;
    Some(rest[..end].trim())
}
