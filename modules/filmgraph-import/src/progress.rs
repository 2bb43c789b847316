use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::pipeline::{ImportError, ImportSummary};

/// Running totals reported after each batch. `batch_index` is zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub batch_index: usize,
    pub processed: u64,
    pub skipped: u64,
    pub total_estimate: Option<u64>,
}

pub trait ProgressSink: Send {
    fn batch_committed(&mut self, progress: &Progress);

    fn finished(&mut self, summary: &ImportSummary);

    /// The run stopped. Nothing from the batch at `progress.batch_index` was
    /// kept; earlier batches stay committed.
    fn failed(&mut self, progress: &Progress, error: &ImportError);
}

/// Reports progress through `tracing`.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn batch_committed(&mut self, p: &Progress) {
        info!(
            batch = p.batch_index,
            processed = p.processed,
            skipped = p.skipped,
            total = ?p.total_estimate,
            "Batch committed"
        );
    }

    fn finished(&mut self, summary: &ImportSummary) {
        info!("Import finished: {summary}");
    }

    fn failed(&mut self, p: &Progress, error: &ImportError) {
        error!(
            batch = p.batch_index,
            processed = p.processed,
            skipped = p.skipped,
            "Import stopped: {error}"
        );
    }
}

/// Terminal progress bar. Falls back to a spinner while the total is unknown.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::no_length();
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] {wide_bar} {pos}/{len} {msg}",
        ) {
            bar.set_style(style);
        }
        Self { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn batch_committed(&mut self, p: &Progress) {
        if let Some(total) = p.total_estimate {
            self.bar.set_length(total);
        }
        self.bar.set_position(p.processed + p.skipped);
        self.bar
            .set_message(format!("batch {} · {} skipped", p.batch_index, p.skipped));
    }

    fn finished(&mut self, summary: &ImportSummary) {
        self.bar.finish_with_message(format!(
            "done · {} imported · {} skipped",
            summary.processed, summary.skipped
        ));
    }

    fn failed(&mut self, p: &Progress, error: &ImportError) {
        self.bar
            .abandon_with_message(format!("stopped at batch {}: {error}", p.batch_index));
    }
}

/// Keeps every update; used to assert on reporting in tests.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    pub updates: Vec<Progress>,
    pub finished: Option<ImportSummary>,
    pub failure: Option<(usize, String)>,
}

impl ProgressSink for RecordingProgress {
    fn batch_committed(&mut self, progress: &Progress) {
        self.updates.push(*progress);
    }

    fn finished(&mut self, summary: &ImportSummary) {
        self.finished = Some(summary.clone());
    }

    fn failed(&mut self, progress: &Progress, error: &ImportError) {
        self.failure = Some((progress.batch_index, error.to_string()));
    }
}
