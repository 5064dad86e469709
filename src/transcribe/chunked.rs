use crate::error::Result;
use crate::media::{plan_chunks, segment_audio, AudioChunk, AudioMetadata};
use crate::transcribe::Transcriber;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Parts are joined with a blank line so chunk boundaries stay readable.
const PART_SEPARATOR: &str = "\n\n";

/// Counters from one chunked transcription run.
#[derive(Debug, Clone, Copy)]
pub struct ChunkStats {
    pub total_chunks: usize,
    pub successful_chunks: usize,
    pub failed_chunks: usize,
}

/// Literal marker substituted for a chunk whose upload failed, so the job
/// still produces a partial transcript instead of aborting.
pub fn error_marker(chunk_name: &str) -> String {
    format!("[CHUNK TRANSCRIPTION ERROR: {chunk_name}]")
}

/// Drives segmentation plus per-chunk transcription for files over the
/// backend's upload ceiling.
pub struct ChunkedOrchestrator {
    transcriber: Arc<dyn Transcriber>,
    show_progress: bool,
}

impl ChunkedOrchestrator {
    pub fn new(transcriber: Arc<dyn Transcriber>) -> Self {
        Self {
            transcriber,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Segment an oversized audio file into `work_dir` and transcribe the
    /// pieces. The caller owns `work_dir` and removes it afterwards.
    pub async fn transcribe_oversized(
        &self,
        audio: &Path,
        metadata: &AudioMetadata,
        target_chunk_bytes: u64,
        work_dir: &Path,
    ) -> Result<(String, ChunkStats)> {
        let plan = plan_chunks(metadata, target_chunk_bytes);
        let chunks = segment_audio(audio, &plan, work_dir)?;
        Ok(self.transcribe_parts(&chunks).await)
    }

    /// Transcribe chunks strictly one at a time, in index order.
    ///
    /// Sequential on purpose: it keeps ordering trivial and avoids hammering
    /// the API. A failed chunk is logged and replaced with an error marker;
    /// the loop always continues to the next chunk.
    pub async fn transcribe_parts(&self, chunks: &[AudioChunk]) -> (String, ChunkStats) {
        let total = chunks.len();
        info!(
            "Transcribing {} chunks sequentially with {}",
            total,
            self.transcriber.name()
        );

        let progress_bar = if self.show_progress {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut parts: Vec<String> = Vec::with_capacity(total);
        let mut successful = 0;
        let mut failed = 0;

        for chunk in chunks {
            debug!("Transcribing chunk {}: {}", chunk.index, chunk.file_name());

            match self.transcriber.transcribe(&chunk.path).await {
                Ok(text) => {
                    successful += 1;
                    parts.push(text.trim().to_string());
                }
                Err(e) => {
                    warn!("Chunk {} failed: {}", chunk.index, e);
                    failed += 1;
                    parts.push(error_marker(&chunk.file_name()));
                }
            }

            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_with_message("Transcription complete");
        }

        info!(
            "Chunk transcription complete: {}/{} chunks successful",
            successful, total
        );

        let stats = ChunkStats {
            total_chunks: total,
            successful_chunks: successful,
            failed_chunks: failed,
        };

        (parts.join(PART_SEPARATOR), stats)
    }
}
