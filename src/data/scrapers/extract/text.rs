//! Line scan over the page's visible text

use super::{normalize_clock, ExtractionStrategy};
use crate::data::scrapers::page::RenderedPage;
use crate::{CommentaryEntry, ExtractionMethod, Source};
use regex::Regex;
use std::sync::OnceLock;

const MIN_LINE_CHARS: usize = 11;
const MIN_TEXT_CHARS: usize = 30;

fn clock_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+['′’](?:\+\d+)?)\s*(?:[-–—]\s*)?(.*)$").expect("valid clock line regex")
    })
}

fn event_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:But|Carton jaune|Carton rouge|Changement)\s+pour\s+")
            .expect("valid header regex")
    })
}

/// Page furniture that ends a commentary block
fn is_boilerplate(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower == "publicité" || lower == "l'équipe" || lower.starts_with("afficher uniquement")
}

pub struct TextStrategy;

impl TextStrategy {
    /// Parse flattened text into entries
    pub fn parse(&self, text: &str, source: Source) -> Vec<CommentaryEntry> {
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        let mut entries = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let Some(caps) = clock_line().captures(lines[i]) else {
                i += 1;
                continue;
            };
            let time = normalize_clock(&caps[1]);

            let mut fragments = Vec::new();
            let first = caps[2].trim();
            if !first.is_empty() {
                fragments.push(first);
            }

            let mut j = i + 1;
            while j < lines.len() {
                let line = lines[j];
                if clock_line().is_match(line) {
                    break;
                }
                if line.is_empty() || is_boilerplate(line) {
                    if !fragments.is_empty() {
                        break;
                    }
                } else if line.chars().count() >= MIN_LINE_CHARS {
                    fragments.push(line);
                }
                j += 1;
            }

            let joined = fragments.join(" ");
            let body = event_header().replace(joined.trim(), "");
            if body.chars().count() >= MIN_TEXT_CHARS && !body.starts_with("http") {
                entries.extend(CommentaryEntry::new(source, &time, &body, ExtractionMethod::Text));
            }

            i = j;
        }

        entries
    }
}

impl ExtractionStrategy for TextStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Text
    }

    fn extract(&self, page: &RenderedPage, source: Source) -> Vec<CommentaryEntry> {
        self.parse(&page.text, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventType;

    #[test]
    fn test_clock_lines_open_entries() {
        let text = "L'ÉQUIPE\n\
            Maroc - Comores\n\
            90'+4\n\
            \n\
            Fin du match ! Le Maroc s'impose 2-0.\n\
            Belle victoire des Lions de l'Atlas ce soir.\n\
            \n\
            Ce texte n'appartient plus au commentaire.\n\
            45′ – But pour le Maroc Brahim Diaz reprend de volée le centre de Hakimi.\n\
            12'\n\
            ok\n\
            https://www.lequipe.fr/partage-du-commentaire\n";

        let entries = TextStrategy.parse(text, Source::Lequipe);
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].time, "90'+4");
        assert_eq!(
            entries[0].text,
            "Fin du match ! Le Maroc s'impose 2-0. Belle victoire des Lions de l'Atlas ce soir."
        );
        assert_eq!(entries[0].extraction_method, Some(ExtractionMethod::Text));

        assert_eq!(entries[1].time, "45'");
        assert_eq!(
            entries[1].text,
            "le Maroc Brahim Diaz reprend de volée le centre de Hakimi."
        );
    }

    #[test]
    fn test_boilerplate_stops_entry() {
        let text = "33'\nCorner pour le Sénégal obtenu par Sadio Mané.\npublicité\nUne annonce sans rapport avec le match.";
        let entries = TextStrategy.parse(text, Source::Lequipe);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].text, "Corner pour le Sénégal obtenu par Sadio Mané.");
        assert_eq!(entries[0].event_type, EventType::Corner);
    }

    #[test]
    fn test_short_lines_skipped() {
        let text = "60'\nSalah\nSalah s'échappe côté droit et centre fort devant le but.";
        let entries = TextStrategy.parse(text, Source::Rmc);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].text.starts_with("Salah s'échappe"));
        assert_eq!(entries[0].event_type, EventType::Goal);
    }
}
