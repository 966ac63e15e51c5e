//! Quality filter for training commentary
//!
//! Every check is independent; the first failing one rejects the entry.

use crate::{CommentaryEntry, FilterConfig};
use std::collections::HashSet;
use std::fmt;

/// Football vocabulary, matched as case-insensitive substrings
pub const FOOTBALL_TERMS: &[&str] = &[
    // Actions
    "but", "goal", "tir", "shoot", "passe", "pass", "dribble", "tacle", "corner", "penalty",
    "coup franc", "free kick", "faute", "foul", "arrêt", "save", "parade", "occasion", "chance",
    "attaque", "attack", "défense", "defense", "contre-attaque", "counter", "frappe",
    // Objects
    "ballon", "ball", "poteau", "post", "lucarne", "cage", "surface", "box", "ligne", "line",
    "filet", "net",
    // People
    "joueur", "player", "gardien", "goalkeeper", "défenseur", "defender", "milieu",
    "midfielder", "attaquant", "forward", "arbitre", "referee", "remplaçant", "substitute",
    "entraîneur", "coach", "capitaine", "captain",
    // Events
    "carton", "card", "jaune", "yellow", "rouge", "red", "remplacement", "substitution",
    "hors-jeu", "offside", "mi-temps", "half-time", "prolongation", "extra time",
    // Directions
    "gauche", "left", "droite", "right", "centre", "center", "aile", "wing", "axe", "axis",
    // Competitions
    "can", "afcon", "ligue", "league", "coupe", "cup", "championnat",
];

/// Length and sentence bounds for one filter mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub min_len: usize,
    pub max_len: usize,
    /// `None` means unbounded
    pub max_sentences: Option<usize>,
}

const MAX_ELLIPSES: usize = 2;
const MIN_ALPHA_RUN: usize = 10;
const TIMESTAMP_ONLY_LEN: usize = 80;
const REPETITION_MIN_WORDS: usize = 10;
const MIN_UNIQUENESS: f64 = 0.5;

/// Why an entry was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    TooShort { len: usize, min: usize },
    TooLong { len: usize, max: usize },
    NoFootballVocabulary,
    StartsWithUrl,
    TooManySentences { count: usize, max: usize },
    ExcessiveEllipsis(usize),
    InsufficientText,
    BareTimestamp,
    Repetitive { uniqueness: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooShort { len, min } => write!(f, "too short ({} < {})", len, min),
            Rejection::TooLong { len, max } => write!(f, "too long ({} > {})", len, max),
            Rejection::NoFootballVocabulary => write!(f, "no football vocabulary"),
            Rejection::StartsWithUrl => write!(f, "starts with URL"),
            Rejection::TooManySentences { count, max } => {
                write!(f, "too many sentences ({} > {})", count, max)
            }
            Rejection::ExcessiveEllipsis(n) => write!(f, "excessive ellipsis ({})", n),
            Rejection::InsufficientText => write!(f, "insufficient text content"),
            Rejection::BareTimestamp => write!(f, "appears to be just a timestamp"),
            Rejection::Repetitive { uniqueness } => {
                write!(f, "too repetitive (uniqueness: {:.2})", uniqueness)
            }
        }
    }
}

/// Deterministic, side-effect-free quality filter
#[derive(Debug, Clone, Copy)]
pub struct QualityFilter {
    thresholds: Thresholds,
}

impl QualityFilter {
    pub fn new(strict: bool) -> Self {
        Self::with_sentence_cap(strict, false)
    }

    /// Strict mode leaves the sentence count unbounded unless
    /// `cap_sentences_in_strict` is set.
    pub fn with_sentence_cap(strict: bool, cap_sentences_in_strict: bool) -> Self {
        let thresholds = if strict {
            Thresholds {
                min_len: 60,
                max_len: 300,
                max_sentences: cap_sentences_in_strict.then_some(3),
            }
        } else {
            Thresholds {
                min_len: 50,
                max_len: 500,
                max_sentences: Some(3),
            }
        };
        QualityFilter { thresholds }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::with_sentence_cap(config.strict, config.cap_sentences_in_strict)
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn is_acceptable(&self, entry: &CommentaryEntry) -> bool {
        self.check(&entry.text).is_ok()
    }

    /// Run the checks in order and report the first failure
    pub fn check(&self, text: &str) -> Result<(), Rejection> {
        let text = text.trim();
        let t = &self.thresholds;

        let len = text.chars().count();
        if len < t.min_len {
            return Err(Rejection::TooShort { len, min: t.min_len });
        }
        if len > t.max_len {
            return Err(Rejection::TooLong { len, max: t.max_len });
        }

        let lower = text.to_lowercase();
        if !FOOTBALL_TERMS.iter().any(|term| lower.contains(term)) {
            return Err(Rejection::NoFootballVocabulary);
        }

        if text.starts_with("http") || text.starts_with("www") {
            return Err(Rejection::StartsWithUrl);
        }

        if let Some(max) = t.max_sentences {
            let count = sentence_count(text);
            if count > max {
                return Err(Rejection::TooManySentences { count, max });
            }
        }

        let ellipses = text.matches("...").count();
        if ellipses > MAX_ELLIPSES {
            return Err(Rejection::ExcessiveEllipsis(ellipses));
        }

        if longest_alpha_run(text) < MIN_ALPHA_RUN {
            return Err(Rejection::InsufficientText);
        }

        if starts_with_timestamp(text) && len < TIMESTAMP_ONLY_LEN {
            return Err(Rejection::BareTimestamp);
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() > REPETITION_MIN_WORDS {
            let distinct: HashSet<&str> = words.iter().copied().collect();
            let uniqueness = distinct.len() as f64 / words.len() as f64;
            if uniqueness < MIN_UNIQUENESS {
                return Err(Rejection::Repetitive { uniqueness });
            }
        }

        Ok(())
    }

    /// Keep acceptable entries, logging the approval rate
    pub fn filter_batch(&self, entries: Vec<CommentaryEntry>) -> Vec<CommentaryEntry> {
        let total = entries.len();
        let mut accepted = Vec::with_capacity(total);

        for entry in entries {
            match self.check(&entry.text) {
                Ok(()) => accepted.push(entry),
                Err(reason) => log::debug!(
                    "Rejected: {} in '{}'",
                    reason,
                    super::dedup::preview(&entry.text, 50)
                ),
            }
        }

        let rate = if total > 0 {
            accepted.len() as f64 / total as f64
        } else {
            0.0
        };
        log::info!("Filtered {} entries:", total);
        log::info!("  Approved: {} ({:.1}%)", accepted.len(), rate * 100.0);
        log::info!("  Rejected: {}", total - accepted.len());

        accepted
    }
}

impl Default for QualityFilter {
    fn default() -> Self {
        Self::new(false)
    }
}

fn sentence_count(text: &str) -> usize {
    text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count()
}

fn longest_alpha_run(text: &str) -> usize {
    let mut best = 0;
    let mut run = 0;
    for c in text.chars() {
        if c.is_alphabetic() {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }
    best
}

/// Digits followed by a minute mark or colon at the very start
fn starts_with_timestamp(text: &str) -> bool {
    let rest = text.trim_start_matches(|c: char| c.is_ascii_digit());
    rest.len() < text.len() && rest.starts_with(['\'', '’', '′', ':'])
}
