//! Progress events published by the extraction pipeline.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Loading,
    Extracting,
    Ocr,
    Chunking,
    Complete,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Loading => "loading",
            ProgressStage::Extracting => "extracting",
            ProgressStage::Ocr => "ocr",
            ProgressStage::Chunking => "chunking",
            ProgressStage::Complete => "complete",
        }
    }
}

impl std::fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One milestone notification. `progress` is a percentage in 0..=100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: ProgressStage,
    pub progress: u8,
    pub message: String,
}
