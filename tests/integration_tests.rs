//! Integration tests for batchscribe
//!
//! These tests validate the integration between components without requiring
//! external API keys or network access.

use batchscribe::config::{Backend, Config, TranscriptionConfig};
use batchscribe::error::BatchscribeError;
use batchscribe::media::{plan_chunks, segment_audio, AudioChunk, AudioMetadata, ChunkPlan};
use batchscribe::pipeline::{
    output_path_for, run_batch, scan_media_files, BatchControl, FileDecision, PipelineConfig,
};
use batchscribe::relabel::{labeled_output_path, split_point};
use batchscribe::transcribe::{ChunkedOrchestrator, Transcriber};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

const MB: u64 = 1024 * 1024;

fn ffmpeg_available() -> bool {
    let check = |tool: &str| {
        Command::new(tool)
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    };
    check("ffmpeg") && check("ffprobe")
}

// ============================================================================
// Config Integration Tests
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();
        assert_eq!(config.backend, Backend::Scribe);
        assert_eq!(config.target_chunk_bytes, 20 * MB);
        assert_eq!(config.split_window, 0.2);
        assert_eq!(config.completion_delay_secs, 20);
    }

    #[test]
    fn test_transcription_config_sentinels_default_unset() {
        let tc = TranscriptionConfig::default();
        assert!(tc.language_code.is_none());
        assert!(tc.num_speakers.is_none());
        assert!(tc.seed.is_none());
    }

    #[test]
    fn test_config_validation_per_backend() {
        let mut config = Config::default();
        assert!(config.validate(Backend::Scribe).is_err());

        config.elevenlabs_api_key = Some("test-key".to_string());
        assert!(config.validate(Backend::Scribe).is_ok());
        assert!(config.validate(Backend::Whisper).is_err());

        config.openai_api_key = Some("sk-test".to_string());
        assert!(config.validate(Backend::Whisper).is_ok());
    }
}

// ============================================================================
// Chunk Planner Tests
// ============================================================================

mod planner_tests {
    use super::*;

    #[test]
    fn test_lecture_scenario() {
        // 90 minutes, 30 MB, 20 MB budget => two chunks of 2700s each
        let metadata = AudioMetadata {
            duration_secs: 5400.0,
            size_bytes: 30 * MB,
        };
        let plan = plan_chunks(&metadata, 20 * MB);
        assert_eq!(plan.chunk_count, 2);
        assert_eq!(plan.chunk_duration_secs, 2700);
    }

    #[test]
    fn test_count_is_ceiling_of_size_over_budget() {
        for (size, expected) in [(MB, 1), (20 * MB, 1), (20 * MB + 1, 2), (45 * MB, 3)] {
            let metadata = AudioMetadata {
                duration_secs: 1000.0,
                size_bytes: size,
            };
            assert_eq!(plan_chunks(&metadata, 20 * MB).chunk_count, expected);
        }
    }

    #[test]
    fn test_reconstructed_duration_never_exceeds_total() {
        let metadata = AudioMetadata {
            duration_secs: 5399.7,
            size_bytes: 55 * MB,
        };
        let plan = plan_chunks(&metadata, 20 * MB);
        assert!(plan.chunk_count * plan.chunk_duration_secs <= metadata.duration_secs as u64);
    }
}

// ============================================================================
// Audio Segmenter Tests
// ============================================================================

mod segmenter_tests {
    use super::*;

    /// Synthesizes a short sine-tone MP3 so segmentation can run for real.
    fn synthesize_audio(dir: &Path, secs: u32) -> Option<PathBuf> {
        let path = dir.join("tone.mp3");
        let output = Command::new("ffmpeg")
            .args(["-y", "-f", "lavfi", "-i"])
            .arg(format!("sine=frequency=440:duration={secs}"))
            .args(["-ac", "1", "-b:a", "64k"])
            .arg(&path)
            .output()
            .ok()?;
        output.status.success().then_some(path)
    }

    #[test]
    fn test_segment_audio_produces_ordered_chunk_files() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let Some(input) = synthesize_audio(dir.path(), 4) else {
            eprintln!("Skipping test: FFmpeg could not synthesize audio");
            return;
        };

        let plan = ChunkPlan {
            chunk_count: 2,
            chunk_duration_secs: 2,
        };
        let out_dir = dir.path().join("chunks");
        std::fs::create_dir_all(&out_dir).unwrap();

        let chunks = segment_audio(&input, &plan, &out_dir).unwrap();

        assert_eq!(chunks.len(), 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.file_name(), format!("chunk_{i:03}.mp3"));
            let size = std::fs::metadata(&chunk.path).unwrap().len();
            assert!(size > 0, "chunk {i} is empty");
        }
    }
}

// ============================================================================
// Chunked Orchestrator Tests
// ============================================================================

mod orchestrator_tests {
    use super::*;
    use batchscribe::error::Result;

    struct FlakyTranscriber {
        calls: AtomicUsize,
        fail_on: usize,
    }

    #[async_trait]
    impl Transcriber for FlakyTranscriber {
        async fn transcribe(&self, audio: &Path) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == self.fail_on {
                return Err(BatchscribeError::Api {
                    status: 500,
                    message: "server hiccup".to_string(),
                });
            }
            Ok(format!("transcript of {}", audio.display()))
        }

        fn name(&self) -> &'static str {
            "Flaky"
        }

        fn max_upload_bytes(&self) -> u64 {
            25 * MB
        }
    }

    fn chunks(count: usize) -> Vec<AudioChunk> {
        (0..count)
            .map(|i| AudioChunk {
                path: PathBuf::from(format!("/tmp/chunk_{i:03}.mp3")),
                index: i,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_other_parts_verbatim() {
        let transcriber = Arc::new(FlakyTranscriber {
            calls: AtomicUsize::new(0),
            fail_on: 1,
        });
        let orchestrator = ChunkedOrchestrator::new(transcriber).with_progress(false);

        let (text, stats) = orchestrator.transcribe_parts(&chunks(4)).await;
        let parts: Vec<&str> = text.split("\n\n").collect();

        assert_eq!(stats.failed_chunks, 1);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "transcript of /tmp/chunk_000.mp3");
        assert_eq!(parts[1], "[CHUNK TRANSCRIPTION ERROR: chunk_001.mp3]");
        assert_eq!(parts[2], "transcript of /tmp/chunk_002.mp3");
        assert_eq!(parts[3], "transcript of /tmp/chunk_003.mp3");
    }
}

// ============================================================================
// Batch Pipeline Tests
// ============================================================================

mod pipeline_tests {
    use super::*;

    /// Records which files the batch loop asked about.
    struct Recorder {
        decisions: AtomicUsize,
        decision: FileDecision,
    }

    impl BatchControl for Recorder {
        fn decide(&self, _file: &Path) -> batchscribe::Result<FileDecision> {
            self.decisions.fetch_add(1, Ordering::SeqCst);
            Ok(self.decision)
        }
    }

    fn test_config() -> Config {
        Config {
            elevenlabs_api_key: Some("test-key".to_string()),
            openai_api_key: Some("sk-test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_output_path_mirrors_basename() {
        let out = output_path_for(Path::new("/in/lecture.mp4"), Path::new("/out"));
        assert_eq!(out, PathBuf::from("/out/lecture.txt"));
    }

    #[test]
    fn test_scan_ignores_unsupported_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lecture.mp4"), b"x").unwrap();
        std::fs::write(dir.path().join("lecture.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("slides.pdf"), b"x").unwrap();

        let files = scan_media_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("lecture.mp4"));
    }

    #[tokio::test]
    async fn test_existing_transcript_short_circuits() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("done.mp3"), b"not real audio").unwrap();
        std::fs::write(dir.path().join("done.txt"), "previous transcript").unwrap();

        let config = test_config();
        let pipeline_config = PipelineConfig {
            backend: Backend::Scribe,
            output_dir: dir.path().to_path_buf(),
            show_progress: false,
        };
        let control = Recorder {
            decisions: AtomicUsize::new(0),
            decision: FileDecision::Continue,
        };

        let stats = run_batch(
            dir.path(),
            &config,
            &pipeline_config,
            &control,
            Arc::new(AtomicBool::new(false)),
        )
        .await
        .unwrap();

        // Never asked, never uploaded, prior output untouched.
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.completed, 0);
        assert_eq!(stats.failed, 0);
        assert_eq!(control.decisions.load(Ordering::SeqCst), 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("done.txt")).unwrap(),
            "previous transcript"
        );
    }

    #[tokio::test]
    async fn test_exit_decision_stops_batch() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"x").unwrap();
        std::fs::write(dir.path().join("b.mp3"), b"x").unwrap();

        let config = test_config();
        let pipeline_config = PipelineConfig {
            backend: Backend::Scribe,
            output_dir: dir.path().to_path_buf(),
            show_progress: false,
        };
        let control = Recorder {
            decisions: AtomicUsize::new(0),
            decision: FileDecision::Exit,
        };

        let stats = run_batch(
            dir.path(),
            &config,
            &pipeline_config,
            &control,
            Arc::new(AtomicBool::new(false)),
        )
        .await
        .unwrap();

        assert!(stats.exited_early);
        assert_eq!(stats.completed, 0);
        assert_eq!(control.decisions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interrupt_stops_before_first_file() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp3"), b"x").unwrap();

        let config = test_config();
        let pipeline_config = PipelineConfig {
            backend: Backend::Scribe,
            output_dir: dir.path().to_path_buf(),
            show_progress: false,
        };
        let control = Recorder {
            decisions: AtomicUsize::new(0),
            decision: FileDecision::Continue,
        };

        let stats = run_batch(
            dir.path(),
            &config,
            &pipeline_config,
            &control,
            Arc::new(AtomicBool::new(true)),
        )
        .await
        .unwrap();

        assert!(stats.exited_early);
        assert_eq!(control.decisions.load(Ordering::SeqCst), 0);
    }
}

// ============================================================================
// Text Split Tests
// ============================================================================

mod split_tests {
    use super::*;

    #[test]
    fn test_boundary_at_48_percent_beats_midpoint() {
        // One paragraph break at 48% of the length and none closer to 50%.
        let text = format!("{}\n\n{}", "a".repeat(480), "b".repeat(518));

        let idx = split_point(&text, 0.2);
        assert_eq!(idx, 482);
        assert_ne!(idx, text.len() / 2);
    }

    #[test]
    fn test_halves_reassemble_to_original() {
        let text = format!("{}. {}\n\n{}", "x".repeat(300), "y".repeat(200), "z".repeat(500));
        let idx = split_point(&text, 0.2);
        assert_eq!(format!("{}{}", &text[..idx], &text[idx..]), text);
    }

    #[test]
    fn test_labeled_output_beside_input() {
        let out = labeled_output_path(Path::new("/t/lecture.txt"));
        assert_eq!(out, PathBuf::from("/t/lecture_labeled.txt"));
    }
}
