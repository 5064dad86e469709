use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{BatchscribeError, Result};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "flv", "wmv"];

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| {
            BatchscribeError::AudioExtraction(format!(
                "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(BatchscribeError::AudioExtraction(
            "FFmpeg check failed".to_string(),
        ));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()
        .map_err(|e| {
            BatchscribeError::AudioExtraction(format!(
                "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(BatchscribeError::AudioExtraction(
            "FFprobe check failed".to_string(),
        ));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// True if the path looks like a video container that needs its audio
/// track extracted before upload.
pub fn is_video_container(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Extract the audio track from a video file as mono MP3.
///
/// Speech recognition doesn't benefit from stereo or high bitrates, so the
/// output is kept small to stay under upload limits where possible.
pub async fn extract_audio(input: &Path, output: &Path) -> Result<()> {
    if !input.exists() {
        return Err(BatchscribeError::FileNotFound(input.display().to_string()));
    }

    info!("Extracting audio from {}", input.display());

    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "libmp3lame", "-ac", "1", "-b:a", "64k"])
        .arg(output)
        .status()
        .map_err(|e| BatchscribeError::AudioExtraction(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(BatchscribeError::AudioExtraction(
            "FFmpeg audio extraction failed".to_string(),
        ));
    }

    if !output.exists() {
        return Err(BatchscribeError::AudioExtraction(
            "Output file was not created".to_string(),
        ));
    }

    info!("Audio extracted to {}", output.display());
    Ok(())
}
