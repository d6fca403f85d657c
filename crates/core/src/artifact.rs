use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of one pipeline run's output.
pub type ArtifactId = Uuid;

/// How the text behind a chunk (or a page) was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Embedded text layer of the PDF.
    Digital,
    /// Page rendered to an image and recognized.
    Ocr,
    /// Chunk spans pages of both kinds.
    Hybrid,
}

impl ExtractionMethod {
    /// Combine the methods of two adjacent pieces of text.
    pub fn merge(self, other: ExtractionMethod) -> ExtractionMethod {
        if self == other {
            self
        } else {
            ExtractionMethod::Hybrid
        }
    }

    pub fn involves_ocr(self) -> bool {
        !matches!(self, ExtractionMethod::Digital)
    }
}

/// A bounded-size, paragraph-aligned slice of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// 0-based position in document order.
    pub index: usize,
    pub content: String,
    /// First page (1-based, inclusive).
    pub page_start: u32,
    /// Last page (1-based, inclusive).
    pub page_end: u32,
    /// Estimated tokens, computed once when the chunk is built.
    pub token_count: usize,
    pub method: ExtractionMethod,
    /// Mean OCR confidence (0-100) of the OCR pages in this chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Facts gathered while walking the pages of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub has_digital_text: bool,
    pub has_scanned_content: bool,
    pub ocr_attempted: bool,
    pub ocr_succeeded: bool,
    /// Mean confidence over pages where OCR produced text; 0 if none did.
    pub ocr_confidence: f32,
    #[serde(rename = "processing_time_ms", with = "duration_ms")]
    pub processing_time: Duration,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Output of one successful pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionArtifact {
    pub id: ArtifactId,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub page_count: u32,
    pub chunks: Vec<Chunk>,
    pub topics: Vec<String>,
    pub full_text: String,
    pub metadata: Metadata,
}

impl ExtractionArtifact {
    /// Total estimated tokens across all chunks.
    pub fn total_tokens(&self) -> usize {
        self.chunks.iter().map(|c| c.token_count).sum()
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_merge() {
        use ExtractionMethod::*;
        assert_eq!(Digital.merge(Digital), Digital);
        assert_eq!(Ocr.merge(Ocr), Ocr);
        assert_eq!(Digital.merge(Ocr), Hybrid);
        assert_eq!(Hybrid.merge(Digital), Hybrid);
        assert!(!Digital.involves_ocr());
        assert!(Hybrid.involves_ocr());
    }

    #[test]
    fn metadata_serialization_omits_empty_warnings() {
        let meta = Metadata {
            has_digital_text: true,
            has_scanned_content: false,
            ocr_attempted: false,
            ocr_succeeded: false,
            ocr_confidence: 0.0,
            processing_time: Duration::from_millis(1500),
            warnings: Vec::new(),
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("warnings").is_none());
        assert_eq!(json["processing_time_ms"], 1500);

        let back: Metadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }

    #[test]
    fn chunk_method_serializes_lowercase() {
        let chunk = Chunk {
            index: 0,
            content: "Body".into(),
            page_start: 1,
            page_end: 2,
            token_count: 1,
            method: ExtractionMethod::Hybrid,
            confidence: Some(87.5),
        };
        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["method"], "hybrid");
        assert_eq!(json["confidence"], 87.5);
    }

    #[test]
    fn total_tokens_sums_chunks() {
        let chunk = |index, token_count| Chunk {
            index,
            content: String::new(),
            page_start: 1,
            page_end: 1,
            token_count,
            method: ExtractionMethod::Digital,
            confidence: None,
        };
        let artifact = ExtractionArtifact {
            id: Uuid::nil(),
            created_at: Utc::now(),
            file_name: None,
            page_count: 1,
            chunks: vec![chunk(0, 120), chunk(1, 35)],
            topics: Vec::new(),
            full_text: String::new(),
            metadata: Metadata {
                has_digital_text: true,
                has_scanned_content: false,
                ocr_attempted: false,
                ocr_succeeded: false,
                ocr_confidence: 0.0,
                processing_time: Duration::ZERO,
                warnings: Vec::new(),
            },
        };
        assert_eq!(artifact.total_tokens(), 155);
    }
}
