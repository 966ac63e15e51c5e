//! Headless Chrome loader for JavaScript-rendered live pages

use super::{PageLoader, RenderedPage};
use crate::{CommentaryError, Result, ScraperConfig, Source};
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Consent buttons matched by their label, in order
const CONSENT_TEXTS: &[&str] = &["Tout refuser", "Refuser", "Continuer sans accepter"];
/// Consent buttons matched by selector, tried after the labels
const CONSENT_SELECTORS: &[&str] = &[r#"[class*="cookie"] button"#, r#"[class*="consent"] button"#];
/// Label of the toggle that restricts the feed to highlights
pub(crate) const HIGHLIGHTS_TOGGLE: &str = "afficher uniquement les temps forts";

const SCROLL_HEIGHT_JS: &str = "document.body.scrollHeight";
const SCROLL_BOTTOM_JS: &str = "window.scrollTo(0, document.body.scrollHeight)";
const SCROLL_TOP_JS: &str = "window.scrollTo(0, 0)";
const INNER_TEXT_JS: &str = "document.body ? document.body.innerText : ''";
const NUXT_STATE_JS: &str = "window.__NUXT__ ? JSON.stringify(window.__NUXT__) : null";

fn browser_error(e: impl std::fmt::Display) -> CommentaryError {
    CommentaryError::Browser(e.to_string())
}

/// Browser process and tab for one page; both are released on drop
struct BrowserSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserSession {
    fn launch(config: &ScraperConfig) -> Result<Self> {
        let args: Vec<&OsStr> = vec![
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--no-first-run"),
            OsStr::new("--no-default-browser-check"),
            OsStr::new("--mute-audio"),
            OsStr::new("--window-size=1920,1080"),
            OsStr::new("--lang=fr-FR"),
        ];
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .idle_browser_timeout(Duration::from_secs(config.navigation_timeout_secs * 2))
            .args(args)
            .build()
            .map_err(browser_error)?;

        let browser = Browser::new(options).map_err(browser_error)?;
        let tab = browser.new_tab().map_err(browser_error)?;
        tab.set_default_timeout(Duration::from_secs(config.navigation_timeout_secs));
        tab.set_user_agent(&config.user_agent, Some(&config.accept_language), None)
            .map_err(browser_error)?;

        Ok(BrowserSession {
            _browser: browser,
            tab,
        })
    }

    fn eval(&self, js: &str) -> Result<Option<serde_json::Value>> {
        let result = self.tab.evaluate(js, false).map_err(browser_error)?;
        Ok(result.value)
    }

    fn eval_string(&self, js: &str) -> Option<String> {
        match self.eval(js) {
            Ok(Some(serde_json::Value::String(s))) => Some(s),
            Ok(_) => None,
            Err(e) => {
                log::debug!("Script failed: {}", e);
                None
            }
        }
    }

    fn scroll_height(&self) -> u64 {
        match self.eval(SCROLL_HEIGHT_JS) {
            Ok(Some(v)) => v.as_f64().map(|h| h as u64).unwrap_or(0),
            _ => 0,
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(true) {
            log::debug!("Tab close failed: {}", e);
        }
    }
}

/// Renders pages in headless Chrome, mimicking a reader
pub struct BrowserLoader {
    config: ScraperConfig,
    /// Where debug artifacts go; `None` disables them
    debug_dir: Option<PathBuf>,
}

impl BrowserLoader {
    pub fn new(config: &ScraperConfig, data_dir: Option<String>) -> Self {
        let debug_dir = if config.save_debug {
            data_dir.map(PathBuf::from)
        } else {
            None
        };
        BrowserLoader {
            config: config.clone(),
            debug_dir,
        }
    }

    fn pause(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }

    /// Click the first consent button found; a missing dialog is fine
    fn dismiss_consent(&self, session: &BrowserSession) {
        match session.eval_string(&consent_script()) {
            Some(matched) => {
                log::info!("Dismissed consent dialog via '{}'", matched);
                self.pause(1000);
            }
            None => log::debug!("No consent dialog found"),
        }
    }

    /// Switch the feed from highlights to every event
    fn reveal_all_events(&self, session: &BrowserSession) {
        self.pause(2000);
        match session.eval(&toggle_script()) {
            Ok(Some(serde_json::Value::Bool(true))) => {
                log::info!("Clicked highlights toggle, showing all commentary");
                self.pause(3000);
            }
            Ok(_) => log::warn!("Highlights toggle not found, feed may already show everything"),
            Err(e) => log::warn!("Could not click highlights toggle: {}", e),
        }
    }

    /// Scroll until the page stops growing or the attempt budget runs out
    fn scroll_to_end(&self, session: &BrowserSession) {
        let mut previous = 0;
        let mut attempts = 0;

        while attempts < self.config.max_scrolls {
            if let Err(e) = session.eval(SCROLL_BOTTOM_JS) {
                log::debug!("Scroll failed: {}", e);
                break;
            }
            self.pause(self.config.scroll_wait_ms);

            let height = session.scroll_height();
            if height == previous {
                log::info!("Finished scrolling after {} attempts", attempts + 1);
                break;
            }
            previous = height;
            attempts += 1;
            log::debug!("Scroll {}/{} - height: {}px", attempts, self.config.max_scrolls, height);
        }

        let _ = session.eval(SCROLL_TOP_JS);
        self.pause(1000);
    }

    fn save_debug(&self, session: &BrowserSession, page: &RenderedPage) {
        let Some(dir) = &self.debug_dir else {
            return;
        };
        let prefix = Source::from_url(&page.url).as_str();

        let result = std::fs::create_dir_all(dir)
            .and_then(|_| std::fs::write(dir.join(format!("{}_page.html", prefix)), &page.html))
            .and_then(|_| std::fs::write(dir.join(format!("{}_text.txt", prefix)), &page.text));
        if let Err(e) = result {
            log::warn!("Failed to save debug dumps: {}", e);
            return;
        }

        match session
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
        {
            Ok(png) => {
                if let Err(e) = std::fs::write(dir.join(format!("{}_debug.png", prefix)), png) {
                    log::warn!("Failed to save screenshot: {}", e);
                }
            }
            Err(e) => log::warn!("Screenshot failed: {}", e),
        }
        log::info!("Debug files saved to {}", dir.display());
    }
}

impl PageLoader for BrowserLoader {
    fn load(&self, url: &str) -> Result<RenderedPage> {
        let session = BrowserSession::launch(&self.config)?;

        log::info!("Loading page...");
        session.tab.navigate_to(url).map_err(browser_error)?;
        session.tab.wait_until_navigated().map_err(browser_error)?;
        self.pause(3000);

        self.dismiss_consent(&session);
        self.reveal_all_events(&session);
        self.scroll_to_end(&session);

        let html = session.tab.get_content().map_err(browser_error)?;
        let mut page = RenderedPage::from_html(url, &html);
        if let Some(text) = session.eval_string(INNER_TEXT_JS) {
            page.text = text;
        }
        if let Some(state) = session.eval_string(NUXT_STATE_JS) {
            page.json_blobs.insert(0, state);
        }

        self.save_debug(&session, &page);
        Ok(page)
    }
}

/// Returns the label or selector of the button it clicked, or null
fn consent_script() -> String {
    format!(
        r#"(() => {{
            const texts = {texts};
            const selectors = {selectors};
            const buttons = Array.from(document.querySelectorAll('button'));
            for (const t of texts) {{
                const b = buttons.find(b => (b.innerText || '').trim().includes(t));
                if (b) {{ b.click(); return t; }}
            }}
            for (const s of selectors) {{
                const b = document.querySelector(s);
                if (b) {{ b.click(); return s; }}
            }}
            return null;
        }})()"#,
        texts = serde_json::json!(CONSENT_TEXTS),
        selectors = serde_json::json!(CONSENT_SELECTORS),
    )
}

/// Returns true when the highlights toggle was clicked
fn toggle_script() -> String {
    format!(
        r#"(() => {{
            const label = {label};
            const nodes = Array.from(document.querySelectorAll('button, label, a, span, [role="switch"]'));
            const el = nodes.find(n => (n.textContent || '').toLowerCase().includes(label));
            if (!el) return false;
            el.click();
            return true;
        }})()"#,
        label = serde_json::json!(HIGHLIGHTS_TOGGLE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_embed_labels() {
        let script = consent_script();
        assert!(script.contains(r#"["Tout refuser","Refuser","Continuer sans accepter"]"#));
        assert!(script.contains(r#"[class*=\"cookie\"] button"#));
        assert!(toggle_script().contains(r#""afficher uniquement les temps forts""#));
    }

    #[test]
    fn test_debug_disabled() {
        let config = ScraperConfig {
            save_debug: false,
            ..Default::default()
        };
        assert!(BrowserLoader::new(&config, Some("data".into())).debug_dir.is_none());
        let config = ScraperConfig::default();
        assert_eq!(
            BrowserLoader::new(&config, Some("data".into())).debug_dir,
            Some(PathBuf::from("data"))
        );
    }
}
