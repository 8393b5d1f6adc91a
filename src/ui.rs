// UI layer: the per-file report printed to the terminal. The compression
// and batch code only talk to the `Reporter` trait, so tests can run them
// silently and the terminal output stays in one place.

use crossterm::style::{StyledContent, Stylize};
use indicatif::HumanBytes;
use std::path::Path;
use std::time::Duration;

use crate::batch::BatchSummary;
use crate::compress::CompressionResult;

pub trait Reporter {
    fn batch_item(&self, _path: &Path) {}
    fn upload(&self, _label: &str) {}
    fn retry(&self, _label: &str, _attempt: u32, _max_attempts: u32, _delay: Duration, _reason: &str) {}
    fn done(&self, _label: &str, _result: &CompressionResult) {}
    fn interrupted(&self, _label: &str) {}
    fn final_ratio(&self, _label: &str, _before: u64, _after: u64, _ratio: f64) {}
    fn saved(&self, _label: &str, _destination: &Path) {}
    fn failed(&self, _label: &str, _error: &dyn std::error::Error) {}
    fn summary(&self, _summary: &BatchSummary) {}
}

/// Reports nothing.
pub struct Silent;

impl Reporter for Silent {}

/// Prints tagged lines to stdout. `quiet` suppresses everything except
/// failures, which go to stderr.
pub struct Console {
    quiet: bool,
}

impl Console {
    pub fn new(quiet: bool) -> Self {
        Console { quiet }
    }

    fn line(&self, tag: StyledContent<&str>, text: impl AsRef<str>) {
        if !self.quiet {
            println!("{} {}", tag, text.as_ref());
        }
    }
}

impl Reporter for Console {
    fn batch_item(&self, path: &Path) {
        self.line("[BATCH]".cyan(), format!("Processing {}", display_name(path)));
    }

    fn upload(&self, label: &str) {
        self.line("[UPLOAD]".blue(), label);
    }

    fn retry(&self, label: &str, attempt: u32, max_attempts: u32, delay: Duration, reason: &str) {
        self.line(
            "[RETRY]".yellow(),
            format!(
                "{} rejected ({}), attempt {}/{}, waiting {:.1}s",
                label,
                reason,
                attempt,
                max_attempts,
                delay.as_secs_f64()
            ),
        );
    }

    fn done(&self, _label: &str, result: &CompressionResult) {
        self.line(
            "[DONE]".green(),
            format!(
                "Compression: {} => {} = {}%",
                result.size_before, result.size_after, result.ratio
            ),
        );
    }

    fn interrupted(&self, label: &str) {
        self.line("[ERROR]".red(), format!("Recursion interrupted for {}", label));
    }

    fn final_ratio(&self, _label: &str, before: u64, after: u64, ratio: f64) {
        self.line(
            "[FINAL]".green().bold(),
            format!("Compression: {} => {} = {}%", before, after, ratio),
        );
    }

    fn saved(&self, _label: &str, destination: &Path) {
        self.line("[SAVED]".dark_green(), destination.display().to_string());
    }

    fn failed(&self, label: &str, error: &dyn std::error::Error) {
        eprintln!("{} {}: {}", "[ERROR]".red().bold(), label, error);
    }

    fn summary(&self, summary: &BatchSummary) {
        self.line(
            "[SUMMARY]".bold(),
            format!(
                "{} compressed, {} failed, {} saved",
                summary.reports.len(),
                summary.failures.len(),
                HumanBytes(summary.bytes_saved())
            ),
        );
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
