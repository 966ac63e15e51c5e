//! Plain HTTP page fetcher for pages that render server-side

use super::{with_retry, PageLoader, RenderedPage};
use crate::{Result, ScraperConfig};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use std::time::Duration;

pub struct HttpLoader {
    client: reqwest::blocking::Client,
    request_delay: Duration,
    max_retries: u32,
}

impl HttpLoader {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        if let Ok(lang) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, lang);
        }

        let client = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(HttpLoader {
            client,
            request_delay: Duration::from_secs_f64(config.request_delay_secs.max(0.0)),
            max_retries: config.max_retries,
        })
    }

    fn fetch(&self, url: &str) -> Result<String> {
        // Rate limit before every attempt
        std::thread::sleep(self.request_delay);
        log::debug!("GET {}", url);
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.text()?)
    }
}

impl PageLoader for HttpLoader {
    fn load(&self, url: &str) -> Result<RenderedPage> {
        log::info!("Fetching {}", url);
        let base_delay = (self.request_delay * 2).max(Duration::from_millis(100));
        let html = with_retry(|| self.fetch(url), self.max_retries, base_delay)?;
        Ok(RenderedPage::from_html(url, &html))
    }
}
