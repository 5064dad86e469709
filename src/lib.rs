pub mod config;
pub mod error;
pub mod interactive;
pub mod media;
pub mod pipeline;
pub mod relabel;
pub mod transcribe;

pub use config::{Backend, Config, TranscriptionConfig};
pub use error::{BatchscribeError, Result};
pub use pipeline::{
    print_summary, run_batch, AutoPilot, BatchControl, BatchStats, FileDecision, PipelineConfig,
};
