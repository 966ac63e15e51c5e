//! Fine-tuning dataset: chat-format training examples and JSONL I/O

use crate::{CommentaryEntry, CommentaryError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Default commentator persona for the system message
pub const DEFAULT_SYSTEM_PROMPT: &str = "Tu es un commentateur sportif professionnel pour Afrique Sports. Tu génères des commentaires de match en français, avec un style vivant, précis et engageant.";

/// How the user prompt is phrased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PromptStyle {
    /// One line with the raw event tag
    #[default]
    Compact,
    /// Multi-line prompt with a French event label
    Detailed,
}

impl std::str::FromStr for PromptStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(PromptStyle::Compact),
            "detailed" => Ok(PromptStyle::Detailed),
            _ => Err(format!("Unknown prompt style: {}. Use compact or detailed.", s)),
        }
    }
}

impl PromptStyle {
    pub fn user_prompt(&self, entry: &CommentaryEntry) -> String {
        match self {
            PromptStyle::Compact => format!(
                "Génère un commentaire pour: Minute {} - {}",
                entry.time, entry.event_type
            ),
            PromptStyle::Detailed => format!(
                "Génère un commentaire de match pour:\n\nMinute: {}\nType d'événement: {}\n\nCommentaire:",
                entry.time,
                entry.event_type.label_fr()
            ),
        }
    }
}

/// One (system, user, assistant) training triple
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub system_prompt: String,
    pub user_prompt: String,
    pub assistant_response: String,
}

impl TrainingExample {
    pub fn from_entry(entry: &CommentaryEntry, style: PromptStyle, system_prompt: &str) -> Self {
        TrainingExample {
            system_prompt: system_prompt.to_string(),
            user_prompt: style.user_prompt(entry),
            assistant_response: entry.text.clone(),
        }
    }

    pub fn to_record(&self) -> ChatRecord {
        ChatRecord {
            messages: vec![
                ChatMessage::new("system", &self.system_prompt),
                ChatMessage::new("user", &self.user_prompt),
                ChatMessage::new("assistant", &self.assistant_response),
            ],
        }
    }

    /// Accepts only system, user, assistant in that order
    pub fn from_record(record: ChatRecord) -> Option<Self> {
        let [system, user, assistant]: [ChatMessage; 3] = record.messages.try_into().ok()?;
        if system.role != "system" || user.role != "user" || assistant.role != "assistant" {
            return None;
        }
        Some(TrainingExample {
            system_prompt: system.content,
            user_prompt: user.content,
            assistant_response: assistant.content,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: &str) -> Self {
        ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

/// One JSONL line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub messages: Vec<ChatMessage>,
}

/// Project entries 1:1 into training examples
pub fn export(entries: &[CommentaryEntry], style: PromptStyle, system_prompt: &str) -> Vec<TrainingExample> {
    entries
        .iter()
        .map(|entry| TrainingExample::from_entry(entry, style, system_prompt))
        .collect()
}

/// Write one compact JSON record per line, UTF-8 preserved
pub fn write_jsonl(path: &Path, examples: &[TrainingExample]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    for example in examples {
        serde_json::to_writer(&mut writer, &example.to_record())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    log::info!("Exported {} examples to {}", examples.len(), path.display());
    Ok(examples.len())
}

/// Read a JSONL file written by [`write_jsonl`]; blank lines are skipped
pub fn read_jsonl(path: &Path) -> Result<Vec<TrainingExample>> {
    let reader = BufReader::new(File::open(path)?);
    let mut examples = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ChatRecord = serde_json::from_str(&line)?;
        let example = TrainingExample::from_record(record).ok_or_else(|| {
            CommentaryError::Parse(format!("Line {}: expected system, user, assistant messages", i + 1))
        })?;
        examples.push(example);
    }

    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EventType, ExtractionMethod, Source};

    fn entry(time: &str, text: &str) -> CommentaryEntry {
        CommentaryEntry::new(Source::Lequipe, time, text, ExtractionMethod::Dom).unwrap()
    }

    #[test]
    fn test_compact_prompt() {
        let goal = entry("67'", "BUT ! Mohamed Salah reprend le centre et trompe le gardien.");
        assert_eq!(goal.event_type, EventType::Goal);
        let example = TrainingExample::from_entry(&goal, PromptStyle::Compact, DEFAULT_SYSTEM_PROMPT);

        assert_eq!(example.user_prompt, "Génère un commentaire pour: Minute 67' - goal");
        assert_eq!(example.assistant_response, goal.text);
        assert_eq!(example.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_detailed_prompt() {
        let card = entry("12'", "Carton jaune pour Elneny, coupable d'un tacle en retard.");
        let prompt = PromptStyle::Detailed.user_prompt(&card);
        assert_eq!(
            prompt,
            "Génère un commentaire de match pour:\n\nMinute: 12'\nType d'événement: Carton jaune\n\nCommentaire:"
        );
    }

    #[test]
    fn test_export_is_one_to_one() {
        let entries = vec![entry("1'", "Coup d'envoi"), entry("2'", "Premier corner")];
        let examples = export(&entries, PromptStyle::Compact, "persona");
        assert_eq!(examples.len(), entries.len());
        for (example, entry) in examples.iter().zip(&entries) {
            assert_eq!(example.assistant_response, entry.text);
        }
    }

    #[test]
    fn test_jsonl_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.jsonl");
        let entries = vec![
            entry("90'+4", "Fin du match, les Éléphants célèbrent avec leurs supporters."),
            entry("45'", "Mi-temps à Abidjan, score vierge après une première période fermée."),
        ];
        let examples = export(&entries, PromptStyle::Detailed, DEFAULT_SYSTEM_PROMPT);

        assert_eq!(write_jsonl(&path, &examples).unwrap(), 2);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.contains("Éléphants"));
        assert!(!raw.lines().any(|l| l.trim().is_empty()));

        let back = read_jsonl(&path).unwrap();
        assert_eq!(back, examples);
    }

    #[test]
    fn test_read_rejects_wrong_roles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(
            &path,
            r#"{"messages":[{"role":"user","content":"a"},{"role":"system","content":"b"},{"role":"assistant","content":"c"}]}"#,
        )
        .unwrap();
        assert!(matches!(read_jsonl(&path), Err(CommentaryError::Parse(_))));
    }

    #[test]
    fn test_prompt_style_from_str() {
        assert_eq!("Detailed".parse::<PromptStyle>(), Ok(PromptStyle::Detailed));
        assert!("verbose".parse::<PromptStyle>().is_err());
    }
}
