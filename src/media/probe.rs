use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::{BatchscribeError, Result};

use super::AudioMetadata;

/// Get duration and size for a media file using FFprobe.
///
/// Fails with a `Probe` error if the tool cannot parse the file or the output
/// omits either field. No retry; the caller skips the file and moves on.
pub fn probe_media(input: &Path) -> Result<AudioMetadata> {
    if !input.exists() {
        return Err(BatchscribeError::FileNotFound(input.display().to_string()));
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration,size",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| BatchscribeError::Probe(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BatchscribeError::Probe(format!("FFprobe failed: {stderr}")));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let metadata = parse_probe_output(&stdout)?;

    debug!(
        "Probed {}: {:.1}s, {} bytes",
        input.display(),
        metadata.duration_secs,
        metadata.size_bytes
    );

    Ok(metadata)
}

/// Parse `key=value` lines from FFprobe's default writer.
fn parse_probe_output(stdout: &str) -> Result<AudioMetadata> {
    let mut duration_secs: Option<f64> = None;
    let mut size_bytes: Option<u64> = None;

    for line in stdout.lines() {
        if let Some(value) = line.strip_prefix("duration=") {
            duration_secs = value.trim().parse().ok();
        } else if let Some(value) = line.strip_prefix("size=") {
            size_bytes = value.trim().parse().ok();
        }
    }

    let duration_secs = duration_secs
        .ok_or_else(|| BatchscribeError::Probe("FFprobe output missing duration".to_string()))?;
    let size_bytes = size_bytes
        .ok_or_else(|| BatchscribeError::Probe("FFprobe output missing size".to_string()))?;

    if duration_secs <= 0.0 {
        return Err(BatchscribeError::Probe(format!(
            "Non-positive duration: {duration_secs}"
        )));
    }
    if size_bytes == 0 {
        return Err(BatchscribeError::Probe("Zero-byte file".to_string()));
    }

    Ok(AudioMetadata {
        duration_secs,
        size_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let stdout = "duration=5400.012000\nsize=31457280\n";
        let meta = parse_probe_output(stdout).unwrap();
        assert!((meta.duration_secs - 5400.012).abs() < 1e-6);
        assert_eq!(meta.size_bytes, 31_457_280);
    }

    #[test]
    fn test_parse_probe_output_missing_duration() {
        let result = parse_probe_output("size=1024\n");
        assert!(matches!(result, Err(BatchscribeError::Probe(_))));
    }

    #[test]
    fn test_parse_probe_output_missing_size() {
        let result = parse_probe_output("duration=12.5\n");
        assert!(matches!(result, Err(BatchscribeError::Probe(_))));
    }

    #[test]
    fn test_parse_probe_output_unparsable_duration() {
        let result = parse_probe_output("duration=N/A\nsize=1024\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_probe_output_rejects_zero_duration() {
        let result = parse_probe_output("duration=0.0\nsize=1024\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_probe_missing_file() {
        let result = probe_media(Path::new("/nonexistent/lecture.mp4"));
        assert!(matches!(result, Err(BatchscribeError::FileNotFound(_))));
    }
}
