//! Fire-and-forget progress publishing for one pipeline run.

use pdfquiz_core::{ProgressEvent, ProgressStage};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Share of the bar reserved for loading; pages fill the range up to chunking.
const LOADED_PERCENT: u8 = 10;
const CHUNKING_PERCENT: u8 = 90;

pub struct ProgressReporter {
    sender: Option<UnboundedSender<ProgressEvent>>,
    last: u8,
}

impl ProgressReporter {
    pub fn new(sender: Option<UnboundedSender<ProgressEvent>>) -> Self {
        Self { sender, last: 0 }
    }

    /// Publish a milestone. Percentages never go backwards, and a closed
    /// receiver silently disables further sends.
    pub fn report(&mut self, stage: ProgressStage, progress: u8, message: impl Into<String>) {
        let progress = progress.min(100).max(self.last);
        self.last = progress;
        let message = message.into();
        debug!(stage = %stage, progress, "{message}");

        if let Some(sender) = &self.sender {
            let event = ProgressEvent { stage, progress, message };
            if sender.send(event).is_err() {
                self.sender = None;
            }
        }
    }

    pub fn loaded(&mut self, page_count: u32) {
        self.report(
            ProgressStage::Loading,
            LOADED_PERCENT,
            format!("Loaded PDF with {page_count} pages"),
        );
    }

    pub fn chunking(&mut self) {
        self.report(ProgressStage::Chunking, CHUNKING_PERCENT, "Building chunks and topics");
    }

    pub fn last_progress(&self) -> u8 {
        self.last
    }
}

/// Percentage at the start of `page` (1-based) out of `total` pages.
pub fn page_percent(page: u32, total: u32) -> u8 {
    if total == 0 {
        return LOADED_PERCENT;
    }
    let span = u32::from(CHUNKING_PERCENT - LOADED_PERCENT);
    let done = page.saturating_sub(1).min(total);
    LOADED_PERCENT + (span * done / total) as u8
}
