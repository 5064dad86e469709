use crate::config::{TranscriptionConfig, SCRIBE_MAX_DURATION_SECS, SCRIBE_MAX_UPLOAD_BYTES};
use crate::error::{BatchscribeError, Result};
use crate::transcribe::{mime_for_extension, Transcriber};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// ElevenLabs speech-to-text endpoint.
const SCRIBE_API_URL: &str = "https://api.elevenlabs.io/v1/speech-to-text";

/// Large uploads over external networks are slow; minutes, not seconds.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// ElevenLabs Scribe client for whole-file uploads.
pub struct ScribeClient {
    client: reqwest::Client,
    api_key: String,
    config: TranscriptionConfig,
    api_url: String,
}

impl ScribeClient {
    pub fn new(api_key: String, config: TranscriptionConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            config,
            api_url: SCRIBE_API_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Build the multipart form: the audio file plus every configured
    /// recognition parameter as a named text field. Unset optionals are
    /// omitted rather than sent as empty strings.
    async fn build_form(&self, audio_path: &Path) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_for_extension(audio_path))?;

        let cfg = &self.config;
        let mut form = Form::new()
            .part("file", file_part)
            .text("model_id", cfg.model_id.clone())
            .text("diarize", cfg.diarize.to_string())
            .text(
                "diarization_threshold",
                cfg.diarization_threshold.to_string(),
            )
            .text("tag_audio_events", cfg.tag_audio_events.to_string())
            .text(
                "timestamps_granularity",
                cfg.timestamps_granularity.clone(),
            )
            .text("temperature", cfg.temperature.to_string())
            .text("use_multi_channel", cfg.use_multi_channel.to_string())
            .text("file_format", cfg.file_format.clone())
            .text("enable_logging", cfg.enable_logging.to_string())
            .text("webhook", cfg.webhook.to_string());

        if let Some(ref lang) = cfg.language_code {
            form = form.text("language_code", lang.clone());
        }
        if let Some(speakers) = cfg.num_speakers {
            form = form.text("num_speakers", speakers.to_string());
        }
        if let Some(seed) = cfg.seed {
            form = form.text("seed", seed.to_string());
        }

        Ok(form)
    }

    async fn call_api(&self, form: Form) -> Result<String> {
        let response = self
            .client
            .post(&self.api_url)
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| BatchscribeError::Upload(format!("Scribe request failed: {e}")))?;

        let status = response.status();
        debug!("Scribe API response status: {}", status);

        let body = response
            .text()
            .await
            .map_err(|e| BatchscribeError::Upload(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(parse_error_body(status.as_u16(), &body));
        }

        let parsed: ScribeResponse = serde_json::from_str(&body)?;
        Ok(parsed.text)
    }
}

/// Pull a human-readable message out of the structured error body if there
/// is one, otherwise fall back to the raw body.
fn parse_error_body(status: u16, body: &str) -> BatchscribeError {
    if let Ok(err) = serde_json::from_str::<ScribeErrorResponse>(body) {
        let message = match err.detail {
            ErrorDetail::Structured { message, .. } => message,
            ErrorDetail::Plain(message) => message,
        };
        return BatchscribeError::Api { status, message };
    }

    BatchscribeError::Api {
        status,
        message: body.to_string(),
    }
}

#[async_trait]
impl Transcriber for ScribeClient {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        debug!("Transcribing {} with Scribe", audio.display());

        // Size is re-checked here for callers that skipped the probe step.
        let metadata = fs::metadata(audio).await?;
        if metadata.len() > self.max_upload_bytes() {
            return Err(BatchscribeError::LimitExceeded(format!(
                "{} bytes exceeds the {} byte ceiling for {}",
                metadata.len(),
                self.max_upload_bytes(),
                self.name()
            )));
        }

        let form = self.build_form(audio).await?;
        let text = self.call_api(form).await?;

        debug!("Scribe returned {} characters", text.len());
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "ElevenLabs Scribe"
    }

    fn max_upload_bytes(&self) -> u64 {
        SCRIBE_MAX_UPLOAD_BYTES
    }

    fn max_duration_secs(&self) -> Option<f64> {
        Some(SCRIBE_MAX_DURATION_SECS)
    }
}

#[derive(Debug, Deserialize)]
struct ScribeResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ScribeErrorResponse {
    detail: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Structured {
        message: String,
        #[allow(dead_code)]
        status: Option<String>,
    },
    Plain(String),
}
