//! Multi-strategy commentary extraction
//!
//! Strategies run in priority order and the first one that yields entries
//! wins; results are never merged across strategies.

pub mod dom;
pub mod json;
pub mod text;

pub use dom::{DomProfile, DomStrategy};
pub use json::JsonStrategy;
pub use text::TextStrategy;

use super::page::RenderedPage;
use crate::{CommentaryEntry, ExtractionMethod, Source};
use regex::Regex;
use std::sync::OnceLock;

/// One way of pulling commentary out of a rendered page
pub trait ExtractionStrategy {
    fn method(&self) -> ExtractionMethod;

    /// Extract entries; an empty result means "not found here", never an error
    fn extract(&self, page: &RenderedPage, source: Source) -> Vec<CommentaryEntry>;
}

/// Ordered list of strategies
pub struct Extractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Extractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Extractor { strategies }
    }

    /// JSON state, then site DOM selectors, then the visible-text scan
    pub fn for_source(source: Source) -> Self {
        Extractor::new(vec![
            Box::new(JsonStrategy),
            Box::new(DomStrategy::new(DomProfile::for_source(source))),
            Box::new(TextStrategy),
        ])
    }

    pub fn extract(&self, page: &RenderedPage, source: Source) -> Vec<CommentaryEntry> {
        for strategy in &self.strategies {
            let entries = strategy.extract(page, source);
            if entries.is_empty() {
                log::debug!("{} strategy found nothing", strategy.method());
                continue;
            }
            log::info!(
                "{} strategy extracted {} entries",
                strategy.method(),
                entries.len()
            );
            return entries;
        }
        log::warn!("No commentary found on {}", page.url);
        Vec::new()
    }
}

/// Match clock token at any position, e.g. `45'`, `45′+2`
pub fn clock_regex() -> &'static Regex {
    static CLOCK: OnceLock<Regex> = OnceLock::new();
    CLOCK.get_or_init(|| Regex::new(r"\d+['′’](?:\+\d+)?").expect("valid clock regex"))
}

/// Replace typographic prime marks with an ASCII apostrophe
pub fn normalize_clock(time: &str) -> String {
    time.trim().replace(['′', '’'], "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(ExtractionMethod, usize);

    impl ExtractionStrategy for Fixed {
        fn method(&self) -> ExtractionMethod {
            self.0
        }

        fn extract(&self, _page: &RenderedPage, source: Source) -> Vec<CommentaryEntry> {
            (0..self.1)
                .filter_map(|i| {
                    CommentaryEntry::new(source, &format!("{}'", i), "Action au milieu", self.0)
                })
                .collect()
        }
    }

    #[test]
    fn test_first_non_empty_strategy_wins() {
        let extractor = Extractor::new(vec![
            Box::new(Fixed(ExtractionMethod::Json, 0)),
            Box::new(Fixed(ExtractionMethod::Dom, 2)),
            Box::new(Fixed(ExtractionMethod::Text, 5)),
        ]);
        let entries = extractor.extract(&RenderedPage::default(), Source::Rmc);
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|e| e.extraction_method == Some(ExtractionMethod::Dom)));
    }

    #[test]
    fn test_nothing_found_is_empty() {
        let extractor = Extractor::for_source(Source::Lequipe);
        assert!(extractor
            .extract(&RenderedPage::from_html("u", "<html><body></body></html>"), Source::Lequipe)
            .is_empty());
    }

    #[test]
    fn test_normalize_clock() {
        assert_eq!(normalize_clock("45′+2"), "45'+2");
        assert_eq!(normalize_clock(" 12’ "), "12'");
        assert!(clock_regex().is_match("90'+4"));
    }
}
