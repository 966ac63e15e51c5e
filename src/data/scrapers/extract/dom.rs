//! Structured DOM extraction driven by per-site selector profiles

use super::{clock_regex, normalize_clock, ExtractionStrategy};
use crate::data::scrapers::page::{collapse_whitespace, RenderedPage};
use crate::{CommentaryEntry, ExtractionMethod, Source};
use scraper::{ElementRef, Html, Selector};

const MIN_TEXT_CHARS: usize = 20;
/// An item selector must match more than this many elements to be trusted
const MIN_ITEMS: usize = 3;

/// Ordered selector candidates for one site layout
#[derive(Debug, Clone, Copy)]
pub struct DomProfile {
    pub name: &'static str,
    /// First matching container scopes the item search; the whole document otherwise
    pub containers: &'static [&'static str],
    pub items: &'static [&'static str],
    pub times: &'static [&'static str],
    pub texts: &'static [&'static str],
}

impl DomProfile {
    pub const LEQUIPE: DomProfile = DomProfile {
        name: "lequipe",
        containers: &[".CommentsLive"],
        items: &[
            "div.CommentsLive__event",
            r#"div[class*="LiveItem"]"#,
            r#"div[class*="live-item"]"#,
            r#"div[class*="LiveEvent"]"#,
            r#"div[class*="CommentItem"]"#,
            r#"div[class*="Timeline"]"#,
            "div[data-time]",
            r#"article[class*="event"]"#,
            r#"li[class*="event"]"#,
        ],
        times: &[
            ".CommentsLive__time",
            r#"span[class*="time"]"#,
            r#"span[class*="minute"]"#,
            "time",
        ],
        texts: &[
            "p.CommentsLive__text",
            r#"p[class*="text"]"#,
            r#"div[class*="description"]"#,
        ],
    };

    pub const RMC: DomProfile = DomProfile {
        name: "rmc",
        containers: &[
            r#"div[class*="live-commentary"]"#,
            r#"div[class*="match-live"]"#,
            r#"div[class*="timeline"]"#,
            "div.live-events",
            r#"ul[class*="event"]"#,
        ],
        items: &[
            r#"div[class*="event-item"]"#,
            r#"div[class*="commentary-item"]"#,
            r#"li[class*="event"]"#,
            "div.match-event",
            "article",
        ],
        times: &[
            r#"span[class*="time"]"#,
            r#"span[class*="minute"]"#,
            r#"[class*="time"]"#,
            "time",
        ],
        texts: &[r#"p[class*="text"]"#, r#"div[class*="description"]"#, "p"],
    };

    pub fn for_source(source: Source) -> Self {
        match source {
            Source::Rmc => DomProfile::RMC,
            _ => DomProfile::LEQUIPE,
        }
    }
}

fn parse_all(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|css| match Selector::parse(css) {
            Ok(sel) => Some(sel),
            Err(e) => {
                log::warn!("Invalid selector '{}': {:?}", css, e);
                None
            }
        })
        .collect()
}

pub struct DomStrategy {
    profile: DomProfile,
    containers: Vec<Selector>,
    items: Vec<Selector>,
    times: Vec<Selector>,
    texts: Vec<Selector>,
}

impl DomStrategy {
    pub fn new(profile: DomProfile) -> Self {
        DomStrategy {
            profile,
            containers: parse_all(profile.containers),
            items: parse_all(profile.items),
            times: parse_all(profile.times),
            texts: parse_all(profile.texts),
        }
    }

    fn find_items<'a>(&self, scope: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        for (css, selector) in self.profile.items.iter().zip(&self.items) {
            let found: Vec<_> = scope.select(selector).collect();
            if found.len() > MIN_ITEMS {
                log::debug!("[{}] {} items match '{}'", self.profile.name, found.len(), css);
                return found;
            }
        }
        Vec::new()
    }

    fn parse_item(&self, item: ElementRef, source: Source) -> Option<CommentaryEntry> {
        let time_el = first_match(item, &self.times);

        let text = match first_match(item, &self.texts) {
            Some(el) => collapse_whitespace(&el.text().collect::<String>()),
            None => text_without(item, time_el),
        };
        if text.chars().count() < MIN_TEXT_CHARS {
            return None;
        }

        let time = match time_el {
            Some(el) => collapse_whitespace(&el.text().collect::<String>()),
            None => clock_regex().find(&text)?.as_str().to_string(),
        };
        if time.is_empty() {
            return None;
        }

        CommentaryEntry::with_markup(
            source,
            &normalize_clock(&time),
            &text,
            Some(&item.html()),
            ExtractionMethod::Dom,
        )
    }
}

impl ExtractionStrategy for DomStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Dom
    }

    fn extract(&self, page: &RenderedPage, source: Source) -> Vec<CommentaryEntry> {
        let document: Html = page.document();
        let scope = self
            .containers
            .iter()
            .find_map(|sel| document.select(sel).next())
            .unwrap_or_else(|| document.root_element());

        self.find_items(scope)
            .into_iter()
            .filter_map(|item| self.parse_item(item, source))
            .collect()
    }
}

fn first_match<'a>(scope: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|sel| scope.select(sel).next())
}

/// Item text with the time element's subtree left out
fn text_without(item: ElementRef, excluded: Option<ElementRef>) -> String {
    let skip = excluded.map(|el| el.id());
    let pieces: Vec<&str> = item
        .descendants()
        .filter(|node| match skip {
            Some(id) => node.id() != id && !node.ancestors().any(|a| a.id() == id),
            None => true,
        })
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect();
    collapse_whitespace(&pieces.join(" "))
}
