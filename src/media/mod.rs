pub mod extract;
pub mod probe;
pub mod segment;

pub use extract::{check_ffmpeg, check_ffprobe, extract_audio, is_video_container};
pub use probe::probe_media;
pub use segment::{plan_chunks, segment_audio, ChunkPlan};

use std::path::PathBuf;

/// Metadata for a media file as reported by the probe tool.
#[derive(Debug, Clone, Copy)]
pub struct AudioMetadata {
    pub duration_secs: f64,
    pub size_bytes: u64,
}

/// One time-bounded slice of an audio file, produced without re-encoding.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub path: PathBuf,
    pub index: usize,
}

impl AudioChunk {
    /// File name for error markers and logging.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}
