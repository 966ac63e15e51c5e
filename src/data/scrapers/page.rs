//! Rendered page snapshot shared by all loaders and extraction strategies

use scraper::{ElementRef, Html, Node, Selector};

/// Embedded JSON scripts shorter than this are ignored
const MIN_JSON_BLOB_LEN: usize = 100;

/// Elements whose text never reaches the reader
const INVISIBLE: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Elements that start a new line in the flattened text
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hr", "li", "main", "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Everything the extraction strategies need from one match page
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
    /// Visible text, one block per line
    pub text: String,
    /// Raw JSON state embedded by the page framework, in priority order
    pub json_blobs: Vec<String>,
    /// Page headline, used as the match label
    pub headline: Option<String>,
}

impl RenderedPage {
    /// Build a snapshot from static HTML
    pub fn from_html(url: &str, html: &str) -> Self {
        let document = Html::parse_document(html);

        RenderedPage {
            url: url.to_string(),
            html: html.to_string(),
            text: visible_text(&document),
            json_blobs: json_blobs(&document),
            headline: headline(&document),
        }
    }

    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn headline(document: &Html) -> Option<String> {
    let h1 = selector("h1")?;
    document
        .select(&h1)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn json_blobs(document: &Html) -> Vec<String> {
    let mut blobs = Vec::new();

    if let Some(next) = selector("script#__NEXT_DATA__") {
        blobs.extend(document.select(&next).map(|el| el.text().collect::<String>()));
    }

    if let Some(scripts) = selector(r#"script[type="application/json"]"#) {
        for script in document.select(&scripts) {
            if script.value().id() == Some("__NEXT_DATA__") {
                continue;
            }
            let text: String = script.text().collect();
            if text.len() > MIN_JSON_BLOB_LEN {
                blobs.push(text);
            }
        }
    }

    blobs
}

/// Approximate `innerText`: skip invisible elements, break lines at block
/// boundaries, trim every line.
fn visible_text(document: &Html) -> String {
    let mut raw = String::new();
    let root = selector("body")
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element());
    flatten(root, &mut raw);

    raw.lines()
        .map(collapse_whitespace)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn flatten(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.replace('\n', " ")),
            Node::Element(el) => {
                let name = el.name();
                if INVISIBLE.contains(&name) {
                    continue;
                }
                let block = BLOCKS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child) = ElementRef::wrap(child) {
                    flatten(child, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Collapse runs of whitespace into single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
