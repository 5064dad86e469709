use crate::error::{BatchscribeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whisper API single-upload ceiling (25 MB).
pub const WHISPER_MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Scribe API single-upload ceiling (3 GB).
pub const SCRIBE_MAX_UPLOAD_BYTES: u64 = 3 * 1024 * 1024 * 1024;

/// Scribe API duration ceiling (10 hours).
pub const SCRIBE_MAX_DURATION_SECS: f64 = 10.0 * 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// ElevenLabs Scribe: whole-file uploads up to 3 GB / 10 h.
    #[default]
    Scribe,
    /// OpenAI Whisper: 25 MB per upload, oversized files are segmented.
    Whisper,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Scribe => write!(f, "scribe"),
            Backend::Whisper => write!(f, "whisper"),
        }
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scribe" => Ok(Backend::Scribe),
            "whisper" => Ok(Backend::Whisper),
            _ => Err(format!("Unknown backend: {}. Use 'scribe' or 'whisper'", s)),
        }
    }
}

/// Recognition parameters sent with every transcription request.
///
/// Every field maps to a named form field on the speech-to-text endpoint;
/// `None` values are omitted from the request entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub model_id: String,
    /// ISO 639 code. `None` lets the service auto-detect.
    pub language_code: Option<String>,
    pub diarize: bool,
    /// Hint for the diarizer. `None` means unknown.
    pub num_speakers: Option<u32>,
    pub diarization_threshold: f32,
    pub tag_audio_events: bool,
    pub timestamps_granularity: String,
    pub temperature: f32,
    pub seed: Option<u64>,
    pub use_multi_channel: bool,
    pub file_format: String,
    pub enable_logging: bool,
    pub webhook: bool,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model_id: "scribe_v1".to_string(),
            language_code: None,
            diarize: true,
            num_speakers: None,
            diarization_threshold: 0.22,
            tag_audio_events: false,
            timestamps_granularity: "word".to_string(),
            temperature: 0.0,
            seed: None,
            use_multi_channel: false,
            file_format: "other".to_string(),
            enable_logging: true,
            webhook: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub elevenlabs_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub backend: Backend,
    /// Byte budget for one chunk when the whisper backend segments a file.
    pub target_chunk_bytes: u64,
    /// Fraction of the transcript length searched around the midpoint for a
    /// paragraph or sentence boundary when splitting for relabeling.
    pub split_window: f64,
    /// Static delay between completion calls, for rate limits.
    pub completion_delay_secs: u64,
    pub transcription: TranscriptionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            elevenlabs_api_key: None,
            openai_api_key: None,
            backend: Backend::default(),
            target_chunk_bytes: 20 * 1024 * 1024,
            split_window: 0.2,
            completion_delay_secs: 20,
            transcription: TranscriptionConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        // Override with environment variables
        if let Ok(key) = std::env::var("ELEVENLABS_API_KEY") {
            config.elevenlabs_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Ok(backend) = std::env::var("BATCHSCRIBE_BACKEND") {
            if let Ok(b) = backend.parse() {
                config.backend = b;
            }
        }
        if let Ok(budget) = std::env::var("BATCHSCRIBE_CHUNK_BYTES") {
            if let Ok(b) = budget.parse() {
                config.target_chunk_bytes = b;
            }
        }

        Ok(config)
    }

    pub fn validate(&self, backend: Backend) -> Result<()> {
        match backend {
            Backend::Scribe => {
                if self.elevenlabs_api_key.is_none() {
                    return Err(BatchscribeError::Config(
                        "ELEVENLABS_API_KEY not set. Export it with: export ELEVENLABS_API_KEY=..."
                            .to_string(),
                    ));
                }
            }
            Backend::Whisper => {
                if self.openai_api_key.is_none() {
                    return Err(BatchscribeError::Config(
                        "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-..."
                            .to_string(),
                    ));
                }
            }
        }

        if self.target_chunk_bytes == 0 {
            return Err(BatchscribeError::Config(
                "target_chunk_bytes must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=0.5).contains(&self.split_window) {
            return Err(BatchscribeError::Config(
                "split_window must be between 0.0 and 0.5".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("batchscribe").join("config.toml"))
    }
}
