use anyhow::{Context, Result};
use batchscribe::config::{Backend, Config};
use batchscribe::interactive::{print_header, InteractivePrompt};
use batchscribe::pipeline::{print_summary, run_batch, AutoPilot, BatchControl, PipelineConfig};
use batchscribe::relabel::{CompletionClient, Relabeler};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "batchscribe")]
#[command(version, about = "Batch lecture transcription")]
#[command(
    long_about = "Walk a directory of lecture recordings, extract the audio with FFmpeg, \
transcribe it with ElevenLabs Scribe or OpenAI Whisper, and write plain-text transcripts. \
Already-transcribed files are skipped."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe every media file in a directory
    Transcribe {
        /// Directory containing video/audio files
        input_dir: PathBuf,

        /// Where transcripts are written (defaults to the input directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Source language code (e.g. en, de); omit for auto-detect
        #[arg(long)]
        lang: Option<String>,

        /// Transcription backend: scribe, whisper
        #[arg(short, long)]
        backend: Option<String>,

        /// Run without the per-file menu (always continue)
        #[arg(short, long)]
        yes: bool,
    },

    /// Label speaker turns in finished transcripts
    Relabel {
        /// Transcript files to relabel
        files: Vec<PathBuf>,

        /// Completion model to use
        #[arg(long)]
        model: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Command::Transcribe {
            input_dir,
            output_dir,
            lang,
            backend,
            yes,
        } => transcribe_command(input_dir, output_dir, lang, backend, yes).await,
        Command::Relabel { files, model } => relabel_command(files, model).await,
    }
}

async fn transcribe_command(
    input_dir: PathBuf,
    output_dir: Option<PathBuf>,
    lang: Option<String>,
    backend: Option<String>,
    yes: bool,
) -> Result<()> {
    if !input_dir.is_dir() {
        anyhow::bail!("Input directory not found: {}", input_dir.display());
    }

    let mut config = Config::load().context("Failed to load configuration")?;

    // The language code is the only recognition parameter the CLI overrides.
    if let Some(lang) = lang {
        config.transcription.language_code = Some(lang);
    }

    let backend: Backend = match backend {
        Some(s) => s.parse().map_err(|e: String| anyhow::anyhow!(e))?,
        None => config.backend,
    };

    config
        .validate(backend)
        .context("Configuration validation failed")?;

    let output_dir = output_dir.unwrap_or_else(|| input_dir.clone());

    if !yes {
        print_header();
    }

    info!("Input dir:  {}", input_dir.display());
    info!("Output dir: {}", output_dir.display());
    info!("Backend:    {}", backend);
    info!(
        "Language:   {}",
        config
            .transcription
            .language_code
            .as_deref()
            .unwrap_or("auto-detect")
    );

    // Ctrl-C stops the batch before the next file; in-flight work finishes.
    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let interrupt = interrupt.clone();
        ctrlc::set_handler(move || {
            interrupt.store(true, Ordering::Relaxed);
        })
        .context("Failed to install Ctrl-C handler")?;
    }

    let pipeline_config = PipelineConfig {
        backend,
        output_dir,
        show_progress: true,
    };

    let control: Box<dyn BatchControl> = if yes {
        Box::new(AutoPilot)
    } else {
        Box::new(InteractivePrompt)
    };

    let stats = run_batch(
        &input_dir,
        &config,
        &pipeline_config,
        control.as_ref(),
        interrupt,
    )
    .await?;

    print_summary(&stats);

    if stats.failed > 0 {
        anyhow::bail!("{} file(s) failed; rerun to retry them", stats.failed);
    }

    Ok(())
}

async fn relabel_command(files: Vec<PathBuf>, model: Option<String>) -> Result<()> {
    if files.is_empty() {
        anyhow::bail!("No transcript files given");
    }

    let config = Config::load().context("Failed to load configuration")?;
    let api_key = config
        .openai_api_key
        .clone()
        .context("OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-...")?;

    let mut client = CompletionClient::new(api_key);
    if let Some(model) = model {
        client = client.with_model(model);
    }

    let relabeler = Relabeler::new(
        client,
        config.split_window,
        Duration::from_secs(config.completion_delay_secs),
    );

    let completed = relabeler.relabel_files(&files).await;
    info!("Relabeled {}/{} transcript(s)", completed, files.len());

    if completed < files.len() {
        anyhow::bail!("{} transcript(s) failed; rerun to retry them", files.len() - completed);
    }

    Ok(())
}
