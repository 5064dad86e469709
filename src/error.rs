use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchscribeError {
    #[error("Media probe failed: {0}")]
    Probe(String),

    #[error("Audio extraction failed: {0}")]
    AudioExtraction(String),

    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Upload limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Cleanup failed: {0}")]
    Cleanup(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BatchscribeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = BatchscribeError::Api {
            status: 422,
            message: "invalid model_id".to_string(),
        };
        assert_eq!(err.to_string(), "API error (422): invalid model_id");
    }
}
