//! Parser for commentary pasted from a match page
//!
//! Each entry is one line: `90'+4 – Fin du match ...`. Event labels at the
//! start of the line are used for classification and then stripped.

use crate::commentary::classify::classify;
use crate::data::scrapers::extract::normalize_clock;
use crate::{CommentaryEntry, ExtractionMethod, Result, Source};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const MIN_TEXT_CHARS: usize = 11;

/// Event labels stripped from the start of a line
const LABEL_PREFIXES: [&str; 4] = [
    r"^But d[e']?\s+[^(]+\(\d+-\d+\)\s*",
    r"^Carton jaune pour\s+",
    r"^Carton rouge pour\s+",
    r"^Changement\s+\([^)]+\)\s*",
];

fn line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+['′’](?:\+\d+)?)\s*[–—-]?\s*(.*)$").expect("valid transcript line regex")
    })
}

fn label_regexes() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        LABEL_PREFIXES
            .iter()
            .map(|p| Regex::new(p).expect("valid event label regex"))
            .collect()
    })
}

pub struct TranscriptParser {
    source: Source,
    match_label: Option<String>,
}

impl TranscriptParser {
    pub fn new(source: Source, match_label: Option<&str>) -> Self {
        TranscriptParser {
            source,
            match_label: match_label.map(str::to_string),
        }
    }

    pub fn parse(&self, content: &str) -> Vec<CommentaryEntry> {
        content
            .lines()
            .filter_map(|line| self.parse_line(line.trim()))
            .collect()
    }

    pub fn parse_file(&self, path: &Path) -> Result<Vec<CommentaryEntry>> {
        let content = std::fs::read_to_string(path)?;
        let entries = self.parse(&content);
        log::info!("Parsed {} entries from {}", entries.len(), path.display());
        Ok(entries)
    }

    fn parse_line(&self, line: &str) -> Option<CommentaryEntry> {
        let caps = line_regex().captures(line)?;
        let time = normalize_clock(&caps[1]);
        let rest = caps[2].trim();

        // Classify before the label is stripped
        let event_type = classify(rest, None);

        let mut text = rest.to_string();
        for prefix in label_regexes() {
            if prefix.is_match(&text) {
                text = prefix.replace(&text, "").into_owned();
                break;
            }
        }
        let text = normalize_quotes(text.trim());
        if text.chars().count() < MIN_TEXT_CHARS {
            return None;
        }

        CommentaryEntry::new(self.source, &time, &text, ExtractionMethod::Transcript)
            .map(|e| e.with_event_type(event_type).in_match(self.match_label.as_deref()))
    }
}

fn normalize_quotes(text: &str) -> String {
    text.replace('\u{2019}', "'")
        .replace(['\u{201c}', '\u{201d}'], "\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventType;

    const DUMP: &str = "Maroc - Comores\n\
        90'+4 – Fin du match Le Maroc s’impose au terme d’un match maîtrisé.\n\
        \n\
        78′ - Changement (Maroc) Boufal remplace Ziyech sous les applaudissements.\n\
        55' But de Brahim Diaz (1-0) Le Madrilène conclut une belle action collective.\n\
        41' Carton jaune pour Elneny, coupable d'un tacle en retard.\n\
        12' ok\n";

    #[test]
    fn test_parse_dump() {
        let parser = TranscriptParser::new(Source::Lequipe, Some("Maroc - Comores"));
        let entries = parser.parse(DUMP);
        assert_eq!(entries.len(), 4);

        assert_eq!(entries[0].time, "90'+4");
        assert_eq!(entries[0].event_type, EventType::FinalWhistle);
        assert_eq!(
            entries[0].text,
            "Fin du match Le Maroc s'impose au terme d'un match maîtrisé."
        );
        assert_eq!(entries[0].match_label.as_deref(), Some("Maroc - Comores"));

        assert_eq!(entries[1].time, "78'");
        assert_eq!(entries[1].event_type, EventType::Substitution);
        assert_eq!(entries[1].text, "Boufal remplace Ziyech sous les applaudissements.");

        assert_eq!(entries[2].event_type, EventType::Goal);
        assert_eq!(entries[2].text, "Le Madrilène conclut une belle action collective.");

        assert_eq!(entries[3].event_type, EventType::YellowCard);
        assert_eq!(entries[3].text, "Elneny, coupable d'un tacle en retard.");
        assert_eq!(entries[3].extraction_method, Some(ExtractionMethod::Transcript));
    }
}
