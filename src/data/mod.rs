//! Data ingestion and storage
//!
//! Scrapers for live match pages, batch collection, the fine-tuning dataset
//! and plain JSON files as storage.

pub mod collector;
pub mod dataset;
pub mod discovery;
pub mod review;
pub mod scrapers;
pub mod synthetic;
pub mod transcript;
pub mod validate;

pub use collector::Collector;
pub use dataset::{PromptStyle, TrainingExample};
pub use scrapers::CommentaryScraper;
pub use transcript::TranscriptParser;

use crate::{CommentaryEntry, Result};
use std::path::Path;

/// Load a JSON array of entries, dropping any whose text is blank
pub fn load_entries(path: &Path) -> Result<Vec<CommentaryEntry>> {
    let content = std::fs::read_to_string(path)?;
    let loaded: Vec<CommentaryEntry> = serde_json::from_str(&content)?;
    let total = loaded.len();

    let entries: Vec<_> = loaded
        .into_iter()
        .filter(|entry| !entry.text.trim().is_empty())
        .collect();
    if entries.len() < total {
        log::warn!(
            "Skipped {} entries with empty text in {}",
            total - entries.len(),
            path.display()
        );
    }

    log::debug!("Loaded {} entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Overwrite a file with a pretty-printed JSON array of entries
pub fn save_entries(path: &Path, entries: &[CommentaryEntry]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(entries)?)?;
    Ok(())
}
