//! Dataset statistics written alongside the filtered commentary

use crate::{CommentaryEntry, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Summary statistics for a commentary dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub total_examples: usize,
    pub avg_length_chars: f64,
    pub avg_length_words: f64,
    pub vocabulary_size: usize,
    /// Distinct lower-cased words over total words
    pub vocabulary_diversity: f64,
    pub sources: BTreeMap<String, usize>,
    pub event_types: BTreeMap<String, usize>,
}

impl QualityMetrics {
    pub fn compute(entries: &[CommentaryEntry]) -> Self {
        if entries.is_empty() {
            return QualityMetrics::default();
        }

        let n = entries.len() as f64;
        let mut total_chars = 0usize;
        let mut total_words = 0usize;
        let mut vocabulary = HashSet::new();
        let mut sources = BTreeMap::new();
        let mut event_types = BTreeMap::new();

        for entry in entries {
            total_chars += entry.text.chars().count();
            for word in entry.text.split_whitespace() {
                total_words += 1;
                vocabulary.insert(word.to_lowercase());
            }
            *sources.entry(entry.source.as_str().to_string()).or_insert(0) += 1;
            *event_types
                .entry(entry.event_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        let vocabulary_diversity = if total_words > 0 {
            vocabulary.len() as f64 / total_words as f64
        } else {
            0.0
        };

        QualityMetrics {
            total_examples: entries.len(),
            avg_length_chars: total_chars as f64 / n,
            avg_length_words: total_words as f64 / n,
            vocabulary_size: vocabulary.len(),
            vocabulary_diversity,
            sources,
            event_types,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Log the summary the way the collection scripts print it
    pub fn log_summary(&self) {
        log::info!("Quality metrics:");
        log::info!("  Total examples: {}", self.total_examples);
        log::info!("  Avg length: {:.1} chars, {:.1} words", self.avg_length_chars, self.avg_length_words);
        log::info!(
            "  Vocabulary: {} words (diversity {:.2})",
            self.vocabulary_size,
            self.vocabulary_diversity
        );
        for (source, count) in &self.sources {
            log::info!("  Source {}: {}", source, count);
        }
        for (event_type, count) in &self.event_types {
            log::info!("  Event {}: {}", event_type, count);
        }
    }
}
