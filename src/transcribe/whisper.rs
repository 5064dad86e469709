use crate::config::WHISPER_MAX_UPLOAD_BYTES;
use crate::error::{BatchscribeError, Result};
use crate::transcribe::{mime_for_extension, Transcriber};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// OpenAI Whisper API endpoint.
const WHISPER_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// OpenAI Whisper API client. Used as the legacy chunked backend: files over
/// the 25 MB ceiling are segmented by the caller and uploaded one chunk at
/// a time.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: Option<String>,
    api_url: String,
}

impl WhisperClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            model: "whisper-1".to_string(),
            language: None,
            api_url: WHISPER_API_URL.to_string(),
        }
    }

    /// Set the source language (ISO 639-1 code).
    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

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

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        Ok(form)
    }

    async fn call_api(&self, form: Form) -> Result<String> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| BatchscribeError::Upload(format!("Whisper request failed: {e}")))?;

        let status = response.status();
        debug!("Whisper API response status: {}", status);

        let body = response
            .text()
            .await
            .map_err(|e| BatchscribeError::Upload(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(BatchscribeError::Api {
                    status: status.as_u16(),
                    message: api_error.error.message,
                });
            }
            return Err(BatchscribeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: WhisperResponse = serde_json::from_str(&body)?;
        Ok(parsed.text)
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        debug!("Transcribing {} with Whisper", audio.display());

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

        debug!("Whisper returned {} characters", text.len());
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }

    fn max_upload_bytes(&self) -> u64 {
        WHISPER_MAX_UPLOAD_BYTES
    }
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[allow(dead_code)]
    r#type: Option<String>,
}
