use crate::error::{BatchscribeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// OpenAI chat completions endpoint.
const COMPLETIONS_API_URL: &str = "https://api.openai.com/v1/chat/completions";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Fixed instruction for relabeling lecture transcripts.
const RELABEL_INSTRUCTION: &str = "You are labeling a lecture transcript. Rewrite the \
transcript with each speaker turn prefixed by one of: LECTURER:, STUDENT QUESTION:, \
STUDENT COMMENT:, LECTURER ANSWER:. Do not change the wording of the transcript itself. \
Return only the relabeled transcript.";

/// Marker substituted for a half whose completion call failed.
pub fn relabel_error_marker(part: usize) -> String {
    format!("[RELABEL ERROR: part {part}]")
}

/// Find a split point near the midpoint of `text`, preferring the nearest
/// preceding paragraph break, then the nearest preceding sentence end, then
/// the exact midpoint. A boundary is only used if it falls within
/// `window_frac` of the text's length before the midpoint.
///
/// The returned index is a valid char boundary; the first half is
/// `&text[..idx]`, the second `&text[idx..]`.
pub fn split_point(text: &str, window_frac: f64) -> usize {
    let len = text.len();
    let mut mid = len / 2;
    while mid > 0 && !text.is_char_boundary(mid) {
        mid -= 1;
    }

    let window = (len as f64 * window_frac) as usize;
    let earliest = mid.saturating_sub(window);
    let head = &text[..mid];

    if let Some(idx) = head.rfind("\n\n") {
        if idx >= earliest {
            return idx + 2;
        }
    }

    if let Some(idx) = head.rfind(". ") {
        if idx >= earliest {
            return idx + 2;
        }
    }

    mid
}

/// Chat-completions client for the relabeling pass.
pub struct CompletionClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl CompletionClient {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            model: "gpt-4o".to_string(),
            api_url: COMPLETIONS_API_URL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at a different endpoint (used by tests).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Send one system+user exchange and return the completion text.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| BatchscribeError::Upload(format!("Completion request failed: {e}")))?;

        let status = response.status();
        debug!("Completions API response status: {}", status);

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

        let parsed: CompletionResponse = serde_json::from_str(&body)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                BatchscribeError::Api {
                    status: status.as_u16(),
                    message: "Completion response contained no choices".to_string(),
                }
            })
    }
}

/// Splits a transcript near its midpoint, relabels each half independently,
/// and concatenates the results. A failed half becomes a marker string so
/// the output is still written. A static sleep between the two completion
/// calls (and between files) respects the endpoint's rate limits.
pub struct Relabeler {
    client: CompletionClient,
    split_window: f64,
    delay: Duration,
}

impl Relabeler {
    pub fn new(client: CompletionClient, split_window: f64, delay: Duration) -> Self {
        Self {
            client,
            split_window,
            delay,
        }
    }

    /// Relabel one transcript string.
    pub async fn relabel_text(&self, transcript: &str) -> String {
        let idx = split_point(transcript, self.split_window);
        let halves = [&transcript[..idx], &transcript[idx..]];

        let mut parts = Vec::with_capacity(2);
        for (i, half) in halves.iter().enumerate() {
            if i > 0 {
                debug!("Waiting {:?} before the next completion call", self.delay);
                tokio::time::sleep(self.delay).await;
            }

            match self.client.complete(RELABEL_INSTRUCTION, half).await {
                Ok(labeled) => parts.push(labeled.trim().to_string()),
                Err(e) => {
                    warn!("Relabeling part {} failed: {}", i + 1, e);
                    parts.push(relabel_error_marker(i + 1));
                }
            }
        }

        parts.join("\n\n")
    }

    /// Relabel one transcript file, writing `<stem>_labeled.txt` beside it.
    pub async fn relabel_file(&self, input: &Path) -> Result<PathBuf> {
        if !input.exists() {
            return Err(BatchscribeError::FileNotFound(input.display().to_string()));
        }

        let output = labeled_output_path(input);
        if output.exists() {
            info!(
                "Skipping {} (labeled output exists: {})",
                input.display(),
                output.display()
            );
            return Ok(output);
        }

        let transcript = fs::read_to_string(input)?;
        let labeled = self.relabel_text(&transcript).await;
        fs::write(&output, labeled)?;

        info!("Wrote labeled transcript to {}", output.display());
        Ok(output)
    }

    /// Relabel a list of transcript files sequentially, with the rate-limit
    /// delay between files. Per-file failures are logged; the loop continues.
    pub async fn relabel_files(&self, files: &[PathBuf]) -> usize {
        let mut completed = 0;

        for (i, file) in files.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }

            match self.relabel_file(file).await {
                Ok(_) => completed += 1,
                Err(e) => warn!("Relabeling {} failed: {}", file.display(), e),
            }
        }

        completed
    }
}

/// `lecture.txt` -> `lecture_labeled.txt`.
pub fn labeled_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let mut output = input.to_path_buf();
    output.set_file_name(format!("{}_labeled.txt", stem.to_string_lossy()));
    output
}

#[derive(Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}
