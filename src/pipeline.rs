use crate::config::{Backend, Config};
use crate::error::{BatchscribeError, Result};
use crate::media::{check_ffmpeg, check_ffprobe, extract_audio, is_video_container, probe_media};
use crate::transcribe::{create_transcriber, ChunkedOrchestrator, Transcriber};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "webm", // Video
    "mp3", "wav", "flac", "m4a", "ogg", "aac", // Audio
];

/// What to do with the next file in the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDecision {
    Continue,
    Skip,
    Exit,
}

/// Progress notifications for one batch run.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    Started { input: &'a Path },
    AlreadyDone { input: &'a Path, output: &'a Path },
    Completed { input: &'a Path, output: &'a Path },
    Failed { input: &'a Path, error: String },
}

/// Decision and notification callbacks for the batch loop, so the same
/// pipeline serves both the interactive menu and unattended runs.
pub trait BatchControl {
    /// Called before each file starts. `Exit` stops the batch before the
    /// next file; there is no mid-file cancellation.
    fn decide(&self, file: &Path) -> Result<FileDecision>;

    fn report(&self, event: &BatchEvent) {
        match event {
            BatchEvent::Started { input } => info!("Processing {}", input.display()),
            BatchEvent::AlreadyDone { input, output } => info!(
                "Skipping {} (transcript exists: {})",
                input.display(),
                output.display()
            ),
            BatchEvent::Completed { input, output } => {
                info!("Finished {} -> {}", input.display(), output.display())
            }
            BatchEvent::Failed { input, error } => {
                warn!("Failed {}: {}", input.display(), error)
            }
        }
    }
}

/// Non-interactive mode: always continue, log to stdout.
pub struct AutoPilot;

impl BatchControl for AutoPilot {
    fn decide(&self, _file: &Path) -> Result<FileDecision> {
        Ok(FileDecision::Continue)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub backend: Backend,
    pub output_dir: PathBuf,
    pub show_progress: bool,
}

/// Counters from one batch run.
#[derive(Debug, Clone)]
pub struct BatchStats {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_time: Duration,
    pub exited_early: bool,
}

/// Transcript path mirroring the input file's base name.
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    output_dir.join(format!("{}.txt", stem.to_string_lossy()))
}

/// List supported media files in a directory, sorted by name.
pub fn scan_media_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(BatchscribeError::FileNotFound(dir.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()) {
                    files.push(path);
                }
            }
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Transcribe one media file and write its transcript.
///
/// Probing, extraction, the size check, segmentation and upload all happen
/// inside one disposable temp directory, removed on success and failure alike.
pub async fn transcribe_file(
    input: &Path,
    output: &Path,
    config: &Config,
    transcriber: &Arc<dyn Transcriber>,
    backend: Backend,
    show_progress: bool,
) -> Result<()> {
    if !input.exists() {
        return Err(BatchscribeError::FileNotFound(input.display().to_string()));
    }

    let temp_dir = tempfile::Builder::new()
        .prefix("batchscribe_")
        .tempdir()
        .map_err(BatchscribeError::Io)?;
    let temp_path = temp_dir.path().to_path_buf();
    debug!("Using temp directory: {}", temp_path.display());

    let result = transcribe_file_inner(
        input,
        output,
        config,
        transcriber,
        backend,
        show_progress,
        &temp_path,
    )
    .await;

    // Cleanup happens regardless of the job outcome; a failed removal is
    // logged but never changes the result.
    if let Err(e) = temp_dir.close() {
        warn!(
            "{}",
            BatchscribeError::Cleanup(format!("{}: {e}", temp_path.display()))
        );
    }

    result
}

async fn transcribe_file_inner(
    input: &Path,
    output: &Path,
    config: &Config,
    transcriber: &Arc<dyn Transcriber>,
    backend: Backend,
    show_progress: bool,
    temp_path: &Path,
) -> Result<()> {
    // Videos get their audio track extracted first; bare audio uploads as-is.
    let audio_path = if is_video_container(input) {
        let extracted = temp_path.join("audio.mp3");
        extract_audio(input, &extracted).await?;
        extracted
    } else {
        input.to_path_buf()
    };

    let metadata = probe_media(&audio_path)?;

    let transcript = if backend == Backend::Whisper
        && metadata.size_bytes > transcriber.max_upload_bytes()
    {
        info!(
            "{} is {} bytes, over the {} byte upload ceiling; segmenting",
            audio_path.display(),
            metadata.size_bytes,
            transcriber.max_upload_bytes()
        );
        let orchestrator =
            ChunkedOrchestrator::new(transcriber.clone()).with_progress(show_progress);
        let (text, stats) = orchestrator
            .transcribe_oversized(&audio_path, &metadata, config.target_chunk_bytes, temp_path)
            .await?;
        if stats.failed_chunks > 0 {
            warn!(
                "{} of {} chunks failed; transcript contains error markers",
                stats.failed_chunks, stats.total_chunks
            );
        }
        text
    } else {
        transcriber.preflight(&metadata)?;
        transcriber.transcribe(&audio_path).await?
    };

    fs::write(output, &transcript)?;
    info!(
        "Wrote {} characters to {}",
        transcript.len(),
        output.display()
    );

    Ok(())
}

/// Run the batch loop over a directory of media files.
///
/// Files are processed strictly sequentially. A file whose transcript
/// already exists is never reprocessed, so rerunning a batch redoes only
/// what previously failed. Per-file errors are reported and the loop moves
/// on; `interrupt` (Ctrl-C) and `FileDecision::Exit` stop before the next
/// file starts.
pub async fn run_batch(
    input_dir: &Path,
    config: &Config,
    pipeline_config: &PipelineConfig,
    control: &dyn BatchControl,
    interrupt: Arc<AtomicBool>,
) -> Result<BatchStats> {
    check_ffmpeg()?;
    check_ffprobe()?;

    fs::create_dir_all(&pipeline_config.output_dir)?;

    let files = scan_media_files(input_dir)?;
    info!(
        "Found {} media files in {}",
        files.len(),
        input_dir.display()
    );

    let transcriber: Arc<dyn Transcriber> =
        Arc::from(create_transcriber(pipeline_config.backend, config)?);

    let start_time = Instant::now();
    let mut stats = BatchStats {
        completed: 0,
        skipped: 0,
        failed: 0,
        total_time: Duration::ZERO,
        exited_early: false,
    };

    for file in &files {
        if interrupt.load(Ordering::Relaxed) {
            info!("Interrupted, stopping before the next file");
            stats.exited_early = true;
            break;
        }

        let output = output_path_for(file, &pipeline_config.output_dir);

        // The transcript's existence is the idempotence marker.
        if output.exists() {
            control.report(&BatchEvent::AlreadyDone {
                input: file,
                output: &output,
            });
            stats.skipped += 1;
            continue;
        }

        match control.decide(file)? {
            FileDecision::Continue => {}
            FileDecision::Skip => {
                stats.skipped += 1;
                continue;
            }
            FileDecision::Exit => {
                stats.exited_early = true;
                break;
            }
        }

        control.report(&BatchEvent::Started { input: file });

        match transcribe_file(
            file,
            &output,
            config,
            &transcriber,
            pipeline_config.backend,
            pipeline_config.show_progress,
        )
        .await
        {
            Ok(()) => {
                control.report(&BatchEvent::Completed {
                    input: file,
                    output: &output,
                });
                stats.completed += 1;
            }
            Err(e) => {
                control.report(&BatchEvent::Failed {
                    input: file,
                    error: e.to_string(),
                });
                stats.failed += 1;
            }
        }
    }

    stats.total_time = start_time.elapsed();
    Ok(stats)
}

/// Print a summary of the batch results.
pub fn print_summary(stats: &BatchStats) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                       Batch Complete                           ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Transcribed: {}", stats.completed);
    println!("  Skipped:     {}", stats.skipped);
    println!("  Failed:      {}", stats.failed);
    println!("  Total time:  {:.1}s", stats.total_time.as_secs_f64());
    if stats.exited_early {
        println!();
        println!("  Note: batch stopped before all files were processed");
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
