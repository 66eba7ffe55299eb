use anyhow::Result;
use nanoclaw_core::RunnerPaths;
use nanoclaw_core::archive::TranscriptArchiver;
use nanoclaw_core::engine::PreCompactInput;
use tracing::warn;

use super::read_stdin;
use crate::cli::PreCompactArgs;

/// Archive the transcript named in the engine's hook payload.
///
/// Always answers `{}` so the engine proceeds with compaction.
pub async fn pre_compact(args: PreCompactArgs) -> Result<i32> {
    let conversations_dir = args
        .conversations_dir
        .unwrap_or_else(|| RunnerPaths::container().conversations_dir);

    match read_stdin().await {
        Ok(raw) => match serde_json::from_str::<PreCompactInput>(&raw) {
            Ok(input) => TranscriptArchiver::new(conversations_dir).run(&input),
            Err(err) => warn!("Ignoring malformed pre-compact payload: {}", err),
        },
        Err(err) => warn!("{:#}", err),
    }

    println!("{{}}");
    Ok(0)
}
