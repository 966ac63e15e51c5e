//! Commentary embedded in the page framework's JSON state

use super::{normalize_clock, ExtractionStrategy};
use crate::data::scrapers::page::RenderedPage;
use crate::{CommentaryEntry, ExtractionMethod, Source};
use serde_json::{Map, Value};

const MAX_DEPTH: usize = 15;
const MIN_TEXT_CHARS: usize = 20;

/// Keys (case-insensitive) whose array value holds commentary items
const LIST_KEYS: &[&str] = &["comments", "commentary", "events", "timeline", "live"];
const TIME_KEYS: &[&str] = &["time", "minute", "clock", "matchTime"];
const TEXT_KEYS: &[&str] = &["text", "comment", "description", "message", "content"];

pub struct JsonStrategy;

impl ExtractionStrategy for JsonStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Json
    }

    fn extract(&self, page: &RenderedPage, _source: Source) -> Vec<CommentaryEntry> {
        let mut entries = Vec::new();

        for blob in &page.json_blobs {
            match serde_json::from_str::<Value>(blob) {
                Ok(value) => search(&value, 0, &mut entries),
                Err(e) => log::debug!("Skipping unparseable JSON state: {}", e),
            }
        }

        entries
    }
}

fn search(value: &Value, depth: usize, out: &mut Vec<CommentaryEntry>) {
    if depth > MAX_DEPTH {
        return;
    }

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if LIST_KEYS.contains(&key.to_lowercase().as_str()) {
                    if let Value::Array(items) = child {
                        out.extend(items.iter().filter_map(Value::as_object).filter_map(entry_from_item));
                    }
                }
                search(child, depth + 1, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                search(item, depth + 1, out);
            }
        }
        _ => {}
    }
}

fn entry_from_item(item: &Map<String, Value>) -> Option<CommentaryEntry> {
    let time = first_field(item, TIME_KEYS)?;
    let text = first_field(item, TEXT_KEYS)?;
    if text.chars().count() <= MIN_TEXT_CHARS {
        return None;
    }

    CommentaryEntry::new(
        Source::EmbeddedJson,
        &normalize_clock(&time),
        &text,
        ExtractionMethod::Json,
    )
}

/// First key holding a non-empty scalar
fn first_field(item: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match item.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventType;

    fn page(blob: &str) -> RenderedPage {
        RenderedPage {
            json_blobs: vec![blob.to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_nested_commentary() {
        let blob = r#"{"data":{"match":{"Timeline":[
            {"minute": 12, "comment": "Carton jaune pour Elneny après un tacle dangereux"},
            {"time": "", "clock": "45′+2", "text": "Dernière occasion avant la pause pour le Maroc"},
            {"time": "50'", "text": "Trop court"},
            "not an object"
        ]}}}"#;

        let entries = JsonStrategy.extract(&page(blob), Source::Lequipe);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].time, "12");
        assert_eq!(entries[0].event_type, EventType::YellowCard);
        assert_eq!(entries[0].source, Source::EmbeddedJson);
        assert_eq!(entries[1].time, "45'+2");
        assert_eq!(entries[1].extraction_method, Some(ExtractionMethod::Json));
    }

    #[test]
    fn test_items_without_time_dropped() {
        let blob = r#"{"events":[{"text":"Une longue action sans horodatage du tout"}]}"#;
        assert!(JsonStrategy.extract(&page(blob), Source::Rmc).is_empty());
    }

    #[test]
    fn test_depth_limit() {
        let mut blob = r#"{"live":[{"time":"3'","text":"Premier corner du match pour le Sénégal"}]}"#.to_string();
        for _ in 0..20 {
            blob = format!(r#"{{"x":{}}}"#, blob);
        }
        assert!(JsonStrategy.extract(&page(&blob), Source::Rmc).is_empty());
    }

    #[test]
    fn test_invalid_json_is_empty() {
        assert!(JsonStrategy.extract(&page("{not json"), Source::Rmc).is_empty());
    }
}
