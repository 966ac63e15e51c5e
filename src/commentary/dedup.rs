//! Order-preserving deduplication of commentary entries

use crate::CommentaryEntry;
use std::collections::HashSet;

/// Number of characters of normalized text used as the dedup key.
///
/// Distinct entries sharing a longer common opening collide; that loss is
/// accepted.
pub const KEY_CHARS: usize = 100;

/// Case-folded, whitespace-collapsed, truncated text key
pub fn dedup_key(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .take(KEY_CHARS)
        .collect()
}

/// Keep the first entry for each key, preserving input order
pub fn deduplicate(entries: Vec<CommentaryEntry>) -> Vec<CommentaryEntry> {
    let before = entries.len();
    let mut seen = HashSet::new();

    let unique: Vec<_> = entries
        .into_iter()
        .filter(|entry| {
            let fresh = seen.insert(dedup_key(&entry.text));
            if !fresh {
                log::debug!("Duplicate removed: {}", preview(&entry.text, 50));
            }
            fresh
        })
        .collect();

    let removed = before - unique.len();
    if removed > 0 {
        log::info!("Removed {} duplicate entries", removed);
    }

    unique
}

/// First `n` characters of a text, for log lines
pub fn preview(text: &str, n: usize) -> String {
    let mut out: String = text.chars().take(n).collect();
    if text.chars().count() > n {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExtractionMethod, Source};

    fn entry(text: &str) -> CommentaryEntry {
        CommentaryEntry::new(Source::Lequipe, "10'", text, ExtractionMethod::Dom).unwrap()
    }

    fn texts(entries: &[CommentaryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn test_trailing_whitespace_duplicate() {
        let mut second = entry("Le Maroc pousse sur le côté droit");
        second.text.push_str("   ");
        second.time = "11'".to_string();

        let result = deduplicate(vec![entry("Le Maroc pousse sur le côté droit"), second]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].time, "10'");
    }

    #[test]
    fn test_case_and_inner_whitespace() {
        let result = deduplicate(vec![
            entry("Corner pour le Sénégal"),
            entry("corner  pour\nle   SÉNÉGAL"),
            entry("Corner pour la Gambie"),
        ]);
        assert_eq!(texts(&result), vec!["Corner pour le Sénégal", "Corner pour la Gambie"]);
    }

    #[test]
    fn test_idempotent_and_order_preserving() {
        let input = vec![
            entry("c troisième action"),
            entry("a première action"),
            entry("c troisième action"),
            entry("b deuxième action"),
            entry("a première action"),
        ];
        let once = deduplicate(input.clone());
        let twice = deduplicate(once.clone());

        assert_eq!(once, twice);
        assert!(once.len() <= input.len());
        assert_eq!(
            texts(&once),
            vec!["c troisième action", "a première action", "b deuxième action"]
        );
    }

    #[test]
    fn test_long_common_prefix_collides() {
        let opening = "x".repeat(KEY_CHARS);
        let result = deduplicate(vec![
            entry(&format!("{} fin A", opening)),
            entry(&format!("{} fin B", opening)),
        ]);
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_key_counts_characters_not_bytes() {
        let key = dedup_key(&"é".repeat(150));
        assert_eq!(key.chars().count(), KEY_CHARS);
    }
}
