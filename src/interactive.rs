use crate::error::{BatchscribeError, Result};
use crate::pipeline::{BatchControl, FileDecision};
use console::style;
use dialoguer::Select;
use std::fs;
use std::path::Path;

/// Per-file menu shown between files in an interactive batch run.
pub struct InteractivePrompt;

impl BatchControl for InteractivePrompt {
    fn decide(&self, file: &Path) -> Result<FileDecision> {
        let size = fs::metadata(file)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "?".to_string());

        println!();
        println!(
            "Next file: {} ({})",
            style(file.display()).cyan(),
            style(size).dim()
        );

        let choice = Select::new()
            .with_prompt("What do you want to do?")
            .items(&["Transcribe", "Skip this file", "Exit batch"])
            .default(0)
            .interact()
            .map_err(|e| BatchscribeError::Io(std::io::Error::other(e.to_string())))?;

        Ok(match choice {
            0 => FileDecision::Continue,
            1 => FileDecision::Skip,
            _ => FileDecision::Exit,
        })
    }
}

pub fn print_header() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║        batchscribe - lecture transcription        ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!();
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
