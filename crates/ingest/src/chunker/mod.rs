//! Paragraph-aligned chunking with page provenance.
//!
//! Paragraphs are accumulated greedily until the next one would push the
//! chunk over the token budget. Paragraphs are never split, so a single
//! paragraph larger than the budget becomes its own oversized chunk.

mod helpers;
mod strategies;
mod types;

pub use helpers::validate_page_map;
pub use strategies::chunk_document;
pub use types::{ChunkConfig, ChunkError, PageSource};
