//! French football commentary toolkit for Afrique Sports
//!
//! Harvests live match commentary from sports sites, filters it into a
//! fine-tuning dataset, and drives live agents that post generated
//! commentary to the content API.

pub mod commentary;
pub mod data;
pub mod live;
pub mod stop;

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use commentary::classify;
use data::dataset::PromptStyle;

/// Site a commentary entry was harvested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Lequipe,
    Rmc,
    #[serde(rename = "json_embedded")]
    EmbeddedJson,
    #[serde(other)]
    Unknown,
}

impl Source {
    /// Detect the site from a page URL
    pub fn from_url(url: &str) -> Self {
        let url = url.to_lowercase();
        if url.contains("lequipe.fr") {
            Source::Lequipe
        } else if url.contains("rmcsport") || url.contains("bfmtv") {
            Source::Rmc
        } else {
            Source::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Lequipe => "lequipe",
            Source::Rmc => "rmc",
            Source::EmbeddedJson => "json_embedded",
            Source::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Lequipe => write!(f, "L'Équipe"),
            Source::Rmc => write!(f, "RMC Sport"),
            Source::EmbeddedJson => write!(f, "embedded JSON"),
            Source::Unknown => write!(f, "unknown"),
        }
    }
}

/// Coarse category of a commentary entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Goal,
    YellowCard,
    RedCard,
    Substitution,
    Penalty,
    Corner,
    FreeKick,
    HalfTime,
    FinalWhistle,
    #[default]
    #[serde(other)]
    Commentary,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Goal => "goal",
            EventType::YellowCard => "yellow_card",
            EventType::RedCard => "red_card",
            EventType::Substitution => "substitution",
            EventType::Penalty => "penalty",
            EventType::Corner => "corner",
            EventType::FreeKick => "free_kick",
            EventType::HalfTime => "half_time",
            EventType::FinalWhistle => "final_whistle",
            EventType::Commentary => "commentary",
        }
    }

    /// French label used in detailed training prompts
    pub fn label_fr(&self) -> &'static str {
        match self {
            EventType::Goal => "But",
            EventType::YellowCard => "Carton jaune",
            EventType::RedCard => "Carton rouge",
            EventType::Substitution => "Remplacement",
            EventType::Penalty => "Pénalty",
            EventType::Corner => "Corner",
            EventType::FreeKick => "Coup franc",
            EventType::HalfTime => "Mi-temps",
            EventType::FinalWhistle => "Coup de sifflet final",
            EventType::Commentary => "Commentaire général",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extraction strategy that produced an entry (diagnostic only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    Json,
    Dom,
    Text,
    Transcript,
    #[serde(other)]
    Other,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::Json => write!(f, "json"),
            ExtractionMethod::Dom => write!(f, "dom"),
            ExtractionMethod::Text => write!(f, "text"),
            ExtractionMethod::Transcript => write!(f, "transcript"),
            ExtractionMethod::Other => write!(f, "other"),
        }
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// One timestamped snippet of match commentary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentaryEntry {
    #[serde(default = "unknown_source")]
    pub source: Source,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_label: Option<String>,
    /// Match clock as displayed ("45'", "45'+2", "HT"); never parsed
    #[serde(default)]
    pub time: String,
    pub text: String,
    #[serde(default)]
    pub event_type: EventType,
    #[serde(default = "now")]
    pub scraped_at: NaiveDateTime,
    #[serde(rename = "method", default, skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<ExtractionMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

fn unknown_source() -> Source {
    Source::Unknown
}

impl CommentaryEntry {
    /// Create an entry, classifying it from its text.
    ///
    /// Returns `None` when the text is empty after trimming.
    pub fn new(source: Source, time: &str, text: &str, method: ExtractionMethod) -> Option<Self> {
        Self::with_markup(source, time, text, None, method)
    }

    /// Create an entry, classifying it from its text and the raw markup it came from
    pub fn with_markup(
        source: Source,
        time: &str,
        text: &str,
        markup: Option<&str>,
        method: ExtractionMethod,
    ) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        Some(CommentaryEntry {
            source,
            match_label: None,
            time: time.trim().to_string(),
            text: text.to_string(),
            event_type: classify::classify(text, markup),
            scraped_at: now(),
            extraction_method: Some(method),
            url: None,
        })
    }

    pub fn in_match(mut self, label: Option<&str>) -> Self {
        self.match_label = label.map(str::to_string);
        self
    }

    pub fn from_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_event_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum CommentaryError {
    #[error("Scraper failed for {data_source}: {message}")]
    Scraper { data_source: Source, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, CommentaryError>;

/// Application configuration loaded from afcon.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub filter: FilterConfig,
    pub export: ExportConfig,
    pub data: DataConfig,
    pub live: LiveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub user_agent: String,
    pub accept_language: String,
    pub timeout_secs: u64,
    /// Polite delay before every HTTP attempt
    pub request_delay_secs: f64,
    pub max_retries: u32,
    /// Sleep between two match pages
    pub page_delay_secs: f64,
    /// Render pages in headless Chrome instead of a plain GET
    pub use_browser: bool,
    pub navigation_timeout_secs: u64,
    pub max_scrolls: u32,
    pub scroll_wait_ms: u64,
    /// Write screenshot, HTML and text dumps of every rendered page
    pub save_debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilterConfig {
    pub strict: bool,
    /// Apply the three-sentence cap in strict mode as well
    pub cap_sentences_in_strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub style: PromptStyle,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub content_api_url: String,
    pub webhook_secret: String,
    pub competition: String,
    pub espn_base_url: String,
    pub model_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Environment variable holding the model provider API key
    pub api_key_env: String,
    pub transcription_model: String,
    pub chunk_secs: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            accept_language: "fr-FR,fr;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
            timeout_secs: 30,
            request_delay_secs: 1.0,
            max_retries: 3,
            page_delay_secs: 5.0,
            use_browser: true,
            navigation_timeout_secs: 60,
            max_scrolls: 20,
            scroll_wait_ms: 2000,
            save_debug: true,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            style: PromptStyle::Compact,
            system_prompt: data::dataset::DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            data_dir: "data".to_string(),
        }
    }
}

impl Default for LiveConfig {
    fn default() -> Self {
        LiveConfig {
            content_api_url: "https://www.afriquesports.net/api/can2025/live-commentary".to_string(),
            webhook_secret: "test-secret".to_string(),
            competition: "CAN 2025".to_string(),
            espn_base_url: "https://site.api.espn.com/apis/site/v2/sports/soccer/caf.nations".to_string(),
            model_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 200,
            temperature: 0.7,
            top_p: 0.9,
            api_key_env: "OPENAI_API_KEY".to_string(),
            transcription_model: "whisper-1".to_string(),
            chunk_secs: 30,
        }
    }
}

impl DataConfig {
    pub fn path(&self, file: &str) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join(file)
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CommentaryError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| CommentaryError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CommentaryError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load the config file if it exists, defaults otherwise
    pub fn load_or_default(path: &str) -> Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_detection() {
        assert_eq!(
            Source::from_url("https://www.lequipe.fr/Football/match-direct/can/2025/maroc-comores-live/670748"),
            Source::Lequipe
        );
        assert_eq!(
            Source::from_url("https://rmcsport.bfmtv.com/football/can/direct"),
            Source::Rmc
        );
        assert_eq!(Source::from_url("https://example.com/match"), Source::Unknown);
    }

    #[test]
    fn test_entry_requires_text() {
        assert!(CommentaryEntry::new(Source::Rmc, "12'", "   ", ExtractionMethod::Dom).is_none());

        let entry = CommentaryEntry::new(
            Source::Rmc,
            " 12' ",
            "Carton jaune pour Elneny, coupable d'un tacle en retard.",
            ExtractionMethod::Dom,
        )
        .unwrap();
        assert_eq!(entry.time, "12'");
        assert_eq!(entry.event_type, EventType::YellowCard);
    }

    #[test]
    fn test_entry_reads_legacy_json_shape() {
        let json = r#"{
            "source": "lequipe",
            "match": "Maroc - Comores",
            "time": "90'+4",
            "text": "Fin du match, le Maroc s'impose.",
            "event_type": "kickoff",
            "scraped_at": "2025-12-21T20:14:03.123456",
            "url": "https://www.lequipe.fr/x",
            "method": "text"
        }"#;

        let entry: CommentaryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.source, Source::Lequipe);
        assert_eq!(entry.match_label.as_deref(), Some("Maroc - Comores"));
        assert_eq!(entry.event_type, EventType::Commentary);
        assert_eq!(entry.extraction_method, Some(ExtractionMethod::Text));

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["match"], "Maroc - Comores");
        assert_eq!(back["method"], "text");
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("afcon.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.filter.strict = true;
        config.save(path).unwrap();

        let loaded = Config::load(path).unwrap();
        assert!(loaded.filter.strict);
        assert_eq!(loaded.scraper.max_scrolls, 20);
        assert_eq!(loaded.live.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str("[filter]\nstrict = true\n").unwrap();
        assert!(config.filter.strict);
        assert_eq!(config.scraper.max_retries, 3);
        assert_eq!(config.data.data_dir, "data");
    }
}
