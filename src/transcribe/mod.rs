pub mod chunked;
pub mod scribe;
pub mod whisper;

pub use chunked::{ChunkStats, ChunkedOrchestrator};
pub use scribe::ScribeClient;
pub use whisper::WhisperClient;

use crate::config::{Backend, Config};
use crate::error::{BatchscribeError, Result};
use crate::media::AudioMetadata;
use async_trait::async_trait;
use std::path::Path;

/// A speech-to-text backend that turns one audio file into transcript text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Upload one audio file (whole file or one chunk) and return its transcript.
    async fn transcribe(&self, audio: &Path) -> Result<String>;

    fn name(&self) -> &'static str;

    /// Hard per-upload size ceiling published by the service.
    fn max_upload_bytes(&self) -> u64;

    /// Duration ceiling, if the service publishes one.
    fn max_duration_secs(&self) -> Option<f64> {
        None
    }

    /// Reject a file known in advance to be over the service's limits,
    /// saving the upload round trip.
    fn preflight(&self, metadata: &AudioMetadata) -> Result<()> {
        if metadata.size_bytes > self.max_upload_bytes() {
            return Err(BatchscribeError::LimitExceeded(format!(
                "{} bytes exceeds the {} byte ceiling for {}",
                metadata.size_bytes,
                self.max_upload_bytes(),
                self.name()
            )));
        }
        if let Some(max_secs) = self.max_duration_secs() {
            if metadata.duration_secs > max_secs {
                return Err(BatchscribeError::LimitExceeded(format!(
                    "{:.0}s exceeds the {:.0}s ceiling for {}",
                    metadata.duration_secs,
                    max_secs,
                    self.name()
                )));
            }
        }
        Ok(())
    }
}

/// Create the transcriber for the selected backend.
pub fn create_transcriber(backend: Backend, config: &Config) -> Result<Box<dyn Transcriber>> {
    match backend {
        Backend::Scribe => {
            let api_key = config.elevenlabs_api_key.as_ref().ok_or_else(|| {
                BatchscribeError::Config(
                    "ElevenLabs API key not set. Set ELEVENLABS_API_KEY environment variable."
                        .to_string(),
                )
            })?;
            Ok(Box::new(ScribeClient::new(
                api_key.clone(),
                config.transcription.clone(),
            )))
        }
        Backend::Whisper => {
            let api_key = config.openai_api_key.as_ref().ok_or_else(|| {
                BatchscribeError::Config(
                    "OpenAI API key not set. Set OPENAI_API_KEY environment variable.".to_string(),
                )
            })?;
            let mut client = WhisperClient::new(api_key.clone());
            if let Some(ref lang) = config.transcription.language_code {
                client = client.with_language(lang.clone());
            }
            Ok(Box::new(client))
        }
    }
}

/// Guess a MIME type for the multipart file part from the extension.
pub(crate) fn mime_for_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}
