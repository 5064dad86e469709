use std::path::Path;
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::{BatchscribeError, Result};

use super::{AudioChunk, AudioMetadata};

/// How an oversized file will be cut into upload-sized pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunk_count: u64,
    pub chunk_duration_secs: u64,
}

/// Compute a chunk plan from probed metadata and a byte budget.
///
/// `chunk_count = ceil(size / target)`, `chunk_duration = floor(duration / count)`,
/// clamped to at least one second so the segmenter always gets a usable value.
/// Deterministic and free of I/O. The caller guarantees `target_chunk_bytes > 0`.
pub fn plan_chunks(metadata: &AudioMetadata, target_chunk_bytes: u64) -> ChunkPlan {
    let chunk_count = metadata.size_bytes.div_ceil(target_chunk_bytes).max(1);
    let chunk_duration_secs = ((metadata.duration_secs / chunk_count as f64).floor() as u64).max(1);

    ChunkPlan {
        chunk_count,
        chunk_duration_secs,
    }
}

/// Split an audio file into time-bounded segments without re-encoding.
///
/// Runs FFmpeg in stream-segmenting mode with a codec copy, writing
/// `chunk_000.<ext>`, `chunk_001.<ext>`, ... into `out_dir`. After the tool
/// finishes, only the files that actually exist are returned: the trailing
/// segment may legitimately be absent when the duration doesn't divide evenly.
pub fn segment_audio(input: &Path, plan: &ChunkPlan, out_dir: &Path) -> Result<Vec<AudioChunk>> {
    if !input.exists() {
        return Err(BatchscribeError::FileNotFound(input.display().to_string()));
    }

    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("mp3")
        .to_lowercase();

    let pattern = out_dir.join(format!("chunk_%03d.{extension}"));

    info!(
        "Segmenting {} into {} chunks of ~{}s",
        input.display(),
        plan.chunk_count,
        plan.chunk_duration_secs
    );

    let output = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args([
            "-f",
            "segment",
            "-segment_time",
            &plan.chunk_duration_secs.to_string(),
            "-c",
            "copy",
            "-reset_timestamps",
            "1",
        ])
        .arg(&pattern)
        .output()
        .map_err(|e| BatchscribeError::Segmentation(format!("Failed to run FFmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BatchscribeError::Segmentation(format!(
            "FFmpeg segmenting failed: {stderr}"
        )));
    }

    let chunks = collect_chunks(out_dir, &extension, plan.chunk_count)?;

    if chunks.is_empty() {
        return Err(BatchscribeError::Segmentation(format!(
            "Expected {} chunks but none were produced",
            plan.chunk_count
        )));
    }

    if (chunks.len() as u64) < plan.chunk_count {
        // Best effort: the segmenter skipped a trailing partial segment.
        warn!(
            "Planned {} chunks but found {} on disk",
            plan.chunk_count,
            chunks.len()
        );
    }

    info!("Created {} audio chunks", chunks.len());
    Ok(chunks)
}

/// Verify which of the expected chunk files exist, in index order.
fn collect_chunks(out_dir: &Path, extension: &str, expected: u64) -> Result<Vec<AudioChunk>> {
    let mut chunks = Vec::new();

    for index in 0..expected {
        let path = out_dir.join(format!("chunk_{index:03}.{extension}"));
        if path.exists() {
            debug!("Found chunk {}: {}", index, path.display());
            chunks.push(AudioChunk {
                path,
                index: index as usize,
            });
        }
    }

    Ok(chunks)
}
