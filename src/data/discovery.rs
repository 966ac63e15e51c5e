//! Match discovery: find match pages on competition calendars and keep the
//! ones with full live commentary

use super::scrapers::browser::HIGHLIGHTS_TOGGLE;
use super::scrapers::{PageLoader, RenderedPage};
use crate::stop::StopFlag;
use crate::Result;
use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

pub const LEQUIPE_BASE_URL: &str = "https://www.lequipe.fr";

/// Calendar pages scanned for match links
pub const COMPETITION_CALENDARS: &[&str] = &[
    "https://www.lequipe.fr/Football/CAN/",
    "https://www.lequipe.fr/Football/can/page-calendrier-resultats",
    "https://www.lequipe.fr/Football/Ligue-1/page-calendrier-resultats",
    "https://www.lequipe.fr/Football/ligue-1-2/page-calendrier-resultats",
    "https://www.lequipe.fr/Football/ligue-des-champions/page-calendrier-resultats",
    "https://www.lequipe.fr/Football/ligue-europa/page-calendrier-resultats",
    "https://www.lequipe.fr/Football/coupe-du-monde/page-calendrier-resultats",
];

pub const COMMENTED_MATCHES_FILE: &str = "lequipe_commented_matches.json";

/// Items of a full live feed
const EVENT_SELECTOR: &str = ".CommentsLive__event";

/// A match counts as fully commented when it has more than this many feed
/// items per highlight
const EVENTS_PER_HIGHLIGHT: usize = 2;

fn match_link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"href="(/Football/match-direct/[^"]+)""#).expect("valid match link regex")
    })
}

fn highlights_count_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?i){}\s*\((\d+)\)", regex::escape(HIGHLIGHTS_TOGGLE)))
            .expect("valid highlights count regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Finished,
    Upcoming,
    HighlightsOnly,
    Error,
}

/// Commentary coverage of one match page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCheck {
    pub url: String,
    pub title: String,
    pub is_commented: bool,
    pub is_fully_commented: bool,
    pub highlights_count: usize,
    pub total_events: usize,
    pub status: MatchStatus,
}

impl MatchCheck {
    fn failed(url: &str) -> Self {
        MatchCheck {
            url: url.to_string(),
            title: "Error".to_string(),
            is_commented: false,
            is_fully_commented: false,
            highlights_count: 0,
            total_events: 0,
            status: MatchStatus::Error,
        }
    }
}

/// Absolute match-direct links in a calendar page, without duplicates
pub fn match_links(html: &str) -> Vec<String> {
    match_link_regex()
        .captures_iter(html)
        .map(|caps| format!("{}{}", LEQUIPE_BASE_URL, &caps[1]))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Classify a loaded match page.
///
/// The highlights toggle only exists on commented matches; its label carries
/// the number of highlights.
pub fn check_commented(page: &RenderedPage) -> MatchCheck {
    let title = page
        .headline
        .clone()
        .unwrap_or_else(|| "Unknown".to_string());
    let lowered = page.text.to_lowercase();

    if !lowered.contains(HIGHLIGHTS_TOGGLE) {
        let status = if lowered.contains("commence") || lowered.contains("à venir") {
            MatchStatus::Upcoming
        } else {
            MatchStatus::HighlightsOnly
        };
        return MatchCheck {
            url: page.url.clone(),
            title,
            is_commented: false,
            is_fully_commented: false,
            highlights_count: 0,
            total_events: 0,
            status,
        };
    }

    let highlights_count = highlights_count_regex()
        .captures(&page.text)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0);
    let total_events = match Selector::parse(EVENT_SELECTOR) {
        Ok(selector) => page.document().select(&selector).count(),
        Err(_) => 0,
    };

    MatchCheck {
        url: page.url.clone(),
        title,
        is_commented: true,
        is_fully_commented: total_events > highlights_count * EVENTS_PER_HIGHLIGHT,
        highlights_count,
        total_events,
        status: MatchStatus::Finished,
    }
}

/// Walks competition calendars and checks every match found
pub struct MatchFinder<'a> {
    loader: &'a dyn PageLoader,
    calendars: Vec<String>,
    delay: Duration,
    stop: StopFlag,
}

impl<'a> MatchFinder<'a> {
    pub fn new(loader: &'a dyn PageLoader, delay: Duration) -> Self {
        MatchFinder {
            loader,
            calendars: COMPETITION_CALENDARS.iter().map(|s| s.to_string()).collect(),
            delay,
            stop: StopFlag::new(),
        }
    }

    pub fn with_calendars(mut self, calendars: Vec<String>) -> Self {
        self.calendars = calendars;
        self
    }

    pub fn with_stop(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// Match URLs from every calendar; a calendar that fails is skipped
    pub fn find_match_urls(&self) -> Vec<String> {
        let mut urls = BTreeSet::new();
        for calendar in &self.calendars {
            if self.stop.is_stopped() {
                break;
            }
            log::info!("Loading {}", calendar);
            match self.loader.load(calendar) {
                Ok(page) => {
                    let links = match_links(&page.html);
                    log::info!("  {} match links", links.len());
                    urls.extend(links);
                }
                Err(e) => log::error!("Failed to load {}: {}", calendar, e),
            }
        }
        log::info!("Found {} match URLs", urls.len());
        urls.into_iter().collect()
    }

    pub fn check(&self, url: &str) -> MatchCheck {
        match self.loader.load(url) {
            Ok(page) => {
                let check = check_commented(&page);
                log::info!(
                    "  {} ({:?}): {} highlights, {} events",
                    check.title,
                    check.status,
                    check.highlights_count,
                    check.total_events
                );
                check
            }
            Err(e) => {
                log::error!("Failed to check {}: {}", url, e);
                MatchCheck::failed(url)
            }
        }
    }

    /// Check every match found and keep the fully commented ones
    pub fn find_commented_matches(&self) -> Vec<MatchCheck> {
        let urls = self.find_match_urls();
        let mut checks = Vec::new();
        for (i, url) in urls.iter().enumerate() {
            if i > 0 && !self.stop.sleep(self.delay) {
                break;
            }
            log::info!("Checking {}/{}: {}", i + 1, urls.len(), url);
            checks.push(self.check(url));
        }

        let commented: Vec<_> = checks.iter().filter(|c| c.is_fully_commented).cloned().collect();
        log::info!("Matches checked: {}", checks.len());
        log::info!("  Fully commented: {}", commented.len());
        log::info!("  Highlights only: {}", checks.iter().filter(|c| !c.is_commented).count());
        log::info!(
            "  Upcoming: {}",
            checks.iter().filter(|c| c.status == MatchStatus::Upcoming).count()
        );
        commented
    }
}

pub fn save_matches(path: &Path, matches: &[MatchCheck]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(matches)?)?;
    Ok(())
}

/// URLs of the fully commented matches in a saved discovery file
pub fn load_commented_urls(path: &Path) -> Result<Vec<String>> {
    let matches: Vec<MatchCheck> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    Ok(matches
        .into_iter()
        .filter(|m| m.is_fully_commented)
        .map(|m| m.url)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CommentaryError;

    const CALENDAR: &str = r#"<html><body>
        <a href="/Football/match-direct/can/2025/maroc-comores-live/670748">Maroc - Comores</a>
        <a href="/Football/match-direct/can/2025/mali-zambie-live/670750">Mali - Zambie</a>
        <a href="/Football/match-direct/can/2025/maroc-comores-live/670748">Maroc - Comores</a>
        <a href="/Football/Actualites/autre-article/1">Article</a>
        </body></html>"#;

    fn commented_page(events: usize) -> String {
        let items: String = (0..events)
            .map(|i| format!(r#"<div class="CommentsLive__event"><p>{}' Action</p></div>"#, i))
            .collect();
        format!(
            r#"<html><body><h1>Maroc - Comores</h1>
            <button>Afficher uniquement les temps forts (5)</button>{}</body></html>"#,
            items
        )
    }

    struct SiteLoader;

    impl PageLoader for SiteLoader {
        fn load(&self, url: &str) -> Result<RenderedPage> {
            if url.contains("calendrier") {
                Ok(RenderedPage::from_html(url, CALENDAR))
            } else if url.contains("670748") {
                Ok(RenderedPage::from_html(url, &commented_page(40)))
            } else if url.contains("670750") {
                Ok(RenderedPage::from_html(
                    url,
                    "<html><body><h1>Mali - Zambie</h1><p>Le match commence à 18h</p></body></html>",
                ))
            } else {
                Err(CommentaryError::Browser(format!("unreachable: {}", url)))
            }
        }
    }

    #[test]
    fn test_match_links() {
        assert_eq!(
            match_links(CALENDAR),
            vec![
                "https://www.lequipe.fr/Football/match-direct/can/2025/mali-zambie-live/670750",
                "https://www.lequipe.fr/Football/match-direct/can/2025/maroc-comores-live/670748",
            ]
        );
    }

    #[test]
    fn test_fully_commented_threshold() {
        let page = RenderedPage::from_html("https://x/670748", &commented_page(11));
        let check = check_commented(&page);
        assert!(check.is_commented);
        assert_eq!(check.highlights_count, 5);
        assert_eq!(check.total_events, 11);
        assert!(check.is_fully_commented);
        assert_eq!(check.title, "Maroc - Comores");

        let page = RenderedPage::from_html("https://x/670748", &commented_page(10));
        assert!(!check_commented(&page).is_fully_commented);
    }

    #[test]
    fn test_uncommented_status() {
        let upcoming = RenderedPage::from_html("https://x", "<html><body><p>Coup d'envoi à venir</p></body></html>");
        assert_eq!(check_commented(&upcoming).status, MatchStatus::Upcoming);

        let brief = RenderedPage::from_html("https://x", "<html><body><p>Score final 2-0</p></body></html>");
        let check = check_commented(&brief);
        assert_eq!(check.status, MatchStatus::HighlightsOnly);
        assert_eq!(check.title, "Unknown");
    }

    #[test]
    fn test_finder_keeps_commented_and_survives_errors() {
        let calendars = vec![
            "https://www.lequipe.fr/Football/can/page-calendrier-resultats".to_string(),
            "https://www.lequipe.fr/Football/broken".to_string(),
        ];
        let finder = MatchFinder::new(&SiteLoader, Duration::ZERO).with_calendars(calendars);
        let commented = finder.find_commented_matches();

        assert_eq!(commented.len(), 1);
        assert!(commented[0].url.ends_with("670748"));
        assert_eq!(finder.check("https://www.lequipe.fr/gone").status, MatchStatus::Error);
    }

    #[test]
    fn test_commented_urls_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(COMMENTED_MATCHES_FILE);
        let finder = MatchFinder::new(&SiteLoader, Duration::ZERO)
            .with_calendars(vec!["https://www.lequipe.fr/calendrier".to_string()]);
        let checks: Vec<_> = finder.find_match_urls().iter().map(|u| finder.check(u)).collect();

        save_matches(&path, &checks).unwrap();
        let urls = load_commented_urls(&path).unwrap();
        assert_eq!(urls, vec!["https://www.lequipe.fr/Football/match-direct/can/2025/maroc-comores-live/670748"]);
    }
}
