//! Keyword-based event classification
//!
//! One ordered rule table shared by the scrapers, the transcript parser and
//! the exporter. The first rule with a matching keyword wins.

use crate::EventType;

/// A single classification rule
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub event_type: EventType,
    pub keywords: &'static [&'static str],
}

/// Rules in priority order: goals before cards before substitutions before penalties
pub const RULES: &[Rule] = &[
    Rule {
        event_type: EventType::Goal,
        keywords: &["but", "buuut", "goal", "buteur", "il marque", "ouvre le score", "⚽"],
    },
    Rule {
        event_type: EventType::YellowCard,
        keywords: &["carton jaune", "avertissement", "yellow", "🟨"],
    },
    Rule {
        event_type: EventType::RedCard,
        keywords: &["carton rouge", "expulsé", "expulsion", "red", "🟥"],
    },
    Rule {
        event_type: EventType::Substitution,
        keywords: &["changement", "remplacement", "remplacé", "substitution", "🔄"],
    },
    Rule {
        event_type: EventType::Penalty,
        keywords: &["penalty", "pénalty", "penalti"],
    },
    Rule {
        event_type: EventType::Corner,
        keywords: &["corner", "🚩"],
    },
    Rule {
        event_type: EventType::FreeKick,
        keywords: &["coup franc", "coup-franc", "free kick", "free-kick"],
    },
    Rule {
        event_type: EventType::HalfTime,
        keywords: &["mi-temps", "half-time", "halftime", "⏸"],
    },
    Rule {
        event_type: EventType::FinalWhistle,
        keywords: &["fin du match", "coup de sifflet final", "full time", "fulltime", "🏁"],
    },
];

/// Classify commentary text, optionally also scanning the element markup it
/// came from (icon and class names often carry the event when the text
/// does not).
pub fn classify(text: &str, markup: Option<&str>) -> EventType {
    let text = text.to_lowercase();
    let markup = markup.map(str::to_lowercase);

    RULES
        .iter()
        .find(|rule| {
            rule.keywords.iter().any(|kw| {
                contains_keyword(&text, kw)
                    || markup.as_deref().is_some_and(|m| contains_keyword(m, kw))
            })
        })
        .map(|rule| rule.event_type)
        .unwrap_or_default()
}

/// Word keywords must sit on word boundaries ("but" must not hit "début"),
/// symbol keywords match anywhere.
fn contains_keyword(haystack: &str, keyword: &str) -> bool {
    let word_like = keyword.chars().next().is_some_and(char::is_alphanumeric);
    if !word_like {
        return haystack.contains(keyword);
    }

    haystack.match_indices(keyword).any(|(start, m)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + m.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yellow_card_not_goal() {
        assert_eq!(
            classify("Carton jaune pour Elneny", None),
            EventType::YellowCard
        );
    }

    #[test]
    fn test_goal_takes_priority() {
        assert_eq!(
            classify("BUT ! Ziyech ouvre le score après un corner", None),
            EventType::Goal
        );
    }

    #[test]
    fn test_word_boundaries() {
        // "début" and "butte" must not read as a goal
        assert_eq!(
            classify("Début de la seconde période, le ballon roule.", None),
            EventType::Commentary
        );
        assert_eq!(classify("Le ballon heurte la butte.", None), EventType::Commentary);
        // "red" inside a word is not a red card
        assert_eq!(
            classify("Une ambiance incredible dans les tribunes", None),
            EventType::Commentary
        );
    }

    #[test]
    fn test_markup_signals() {
        let markup = r#"<div class="CommentsLive__event"><span class="icon icon--yellow-card"></span></div>"#;
        assert_eq!(
            classify("Elneny stoppe Hakimi irrégulièrement.", Some(markup)),
            EventType::YellowCard
        );
        // <button> must not match "but"
        assert_eq!(
            classify("Belle séquence de possession.", Some("<button>Partager</button>")),
            EventType::Commentary
        );
    }

    #[test]
    fn test_emoji_keywords() {
        assert_eq!(classify("🔄 Entrée de Boufal", None), EventType::Substitution);
        assert_eq!(classify("🚩 pour le Maroc", None), EventType::Corner);
    }

    #[test]
    fn test_remaining_rules() {
        assert_eq!(classify("Pénalty pour la Côte d'Ivoire !", None), EventType::Penalty);
        assert_eq!(classify("Coup franc bien placé", None), EventType::FreeKick);
        assert_eq!(classify("C'est la mi-temps à Rabat", None), EventType::HalfTime);
        assert_eq!(classify("Fin du match à Agadir", None), EventType::FinalWhistle);
        assert_eq!(classify("Le ballon circule en défense", None), EventType::Commentary);
    }
}
