//! Page loading and commentary scraping for live match pages

pub mod browser;
pub mod extract;
pub mod http;
pub mod page;

pub use browser::BrowserLoader;
pub use extract::Extractor;
pub use http::HttpLoader;
pub use page::RenderedPage;

use crate::commentary::dedup;
use crate::{CommentaryEntry, CommentaryError, Result, ScraperConfig, Source};
use std::time::Duration;

/// Anything that can turn a URL into a rendered page
pub trait PageLoader {
    fn load(&self, url: &str) -> Result<RenderedPage>;
}

/// Longest wait between two attempts
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Delay before retry number `attempt + 1`: doubles each time, capped
pub fn backoff_delay(base_delay: Duration, attempt: u32) -> Duration {
    base_delay
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(MAX_BACKOFF)
}

/// Retry an operation, doubling the delay after each failure
pub fn with_retry<T, F>(mut operation: F, max_attempts: u32, base_delay: Duration) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut last_error = None;
    for attempt in 0..max_attempts {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                log::warn!("Attempt {}/{} failed: {}", attempt + 1, max_attempts, e);
                last_error = Some(e);
                if attempt + 1 < max_attempts {
                    std::thread::sleep(backoff_delay(base_delay, attempt));
                }
            }
        }
    }
    Err(last_error.unwrap_or_else(|| CommentaryError::Config("max_attempts must be at least 1".into())))
}

/// Headless browser or plain HTTP, depending on the config
pub fn loader_from_config(config: &crate::Config) -> Result<Box<dyn PageLoader>> {
    Ok(if config.scraper.use_browser {
        Box::new(BrowserLoader::new(&config.scraper, Some(config.data.data_dir.clone())))
    } else {
        Box::new(HttpLoader::new(&config.scraper)?)
    })
}

/// Loads match pages and extracts their commentary
pub struct CommentaryScraper {
    loader: Box<dyn PageLoader>,
}

impl CommentaryScraper {
    pub fn new(loader: Box<dyn PageLoader>) -> Self {
        CommentaryScraper { loader }
    }

    pub fn from_config(config: &crate::Config) -> Result<Self> {
        Ok(CommentaryScraper::new(loader_from_config(config)?))
    }

    /// Scrape one match page; a page that fails to load yields no entries
    pub fn scrape_match(&self, url: &str) -> Vec<CommentaryEntry> {
        match self.try_scrape_match(url) {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("Failed to scrape {}: {}", url, e);
                Vec::new()
            }
        }
    }

    pub fn try_scrape_match(&self, url: &str) -> Result<Vec<CommentaryEntry>> {
        let source = Source::from_url(url);
        log::info!("Scraping {} page: {}", source, url);

        let page = self.loader.load(url).map_err(|e| CommentaryError::Scraper {
            data_source: source,
            message: e.to_string(),
        })?;
        let entries = Extractor::for_source(source).extract(&page, source);
        let entries: Vec<_> = entries
            .into_iter()
            .map(|e| e.in_match(page.headline.as_deref()).from_url(url))
            .collect();

        let unique = dedup::deduplicate(entries);
        log::info!("Extracted {} unique entries from {}", unique.len(), url);
        Ok(unique)
    }
}

/// Polite pause between two pages; negative values mean none
pub fn page_delay(config: &ScraperConfig) -> Duration {
    Duration::try_from_secs_f64(config.page_delay_secs).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtractionMethod;
    use std::cell::Cell;

    struct StaticLoader(&'static str);

    impl PageLoader for StaticLoader {
        fn load(&self, url: &str) -> Result<RenderedPage> {
            Ok(RenderedPage::from_html(url, self.0))
        }
    }

    struct FailingLoader;

    impl PageLoader for FailingLoader {
        fn load(&self, url: &str) -> Result<RenderedPage> {
            Err(CommentaryError::Browser(format!("navigation timed out: {}", url)))
        }
    }

    #[test]
    fn test_with_retry_recovers() {
        let calls = Cell::new(0);
        let result = with_retry(
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err(CommentaryError::Parse("flaky".into()))
                } else {
                    Ok(calls.get())
                }
            },
            3,
            Duration::from_millis(1),
        );
        assert_eq!(result.unwrap(), 3);
    }

    #[test]
    fn test_with_retry_gives_up() {
        let calls = Cell::new(0);
        let result: Result<()> = with_retry(
            || {
                calls.set(calls.get() + 1);
                Err(CommentaryError::Parse("down".into()))
            },
            2,
            Duration::from_millis(1),
        );
        assert!(result.is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_backoff_doubles_and_saturates() {
        let base = Duration::from_secs(2);
        assert_eq!(backoff_delay(base, 0), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, 3), Duration::from_secs(16));
        assert_eq!(backoff_delay(base, 40), MAX_BACKOFF);
        assert_eq!(backoff_delay(base, u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn test_scrape_match_tags_entries() {
        let html = r#"<html><body><h1>Maroc - Comores</h1>
            <p>12'</p><p>Carton jaune pour Elneny, auteur d'un tacle en retard.</p>
            <p>12'</p><p>Carton jaune pour Elneny, auteur d'un tacle en retard.</p>
            </body></html>"#;
        let scraper = CommentaryScraper::new(Box::new(StaticLoader(html)));
        let url = "https://www.lequipe.fr/Football/match-direct/can/2025/maroc-comores-live/670748";

        let entries = scraper.scrape_match(url);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].match_label.as_deref(), Some("Maroc - Comores"));
        assert_eq!(entries[0].url.as_deref(), Some(url));
        assert_eq!(entries[0].extraction_method, Some(ExtractionMethod::Text));
    }

    #[test]
    fn test_failed_page_is_empty() {
        let scraper = CommentaryScraper::new(Box::new(FailingLoader));
        assert!(scraper.scrape_match("https://www.lequipe.fr/x").is_empty());

        let err = scraper.try_scrape_match("https://rmcsport.bfmtv.com/x").unwrap_err();
        assert!(matches!(err, CommentaryError::Scraper { data_source: Source::Rmc, .. }));
    }
}
