//! Live agents: turn match events into French commentary and publish it
//!
//! Events come either from the ESPN match summary (replay) or from a
//! transcribed audio stream. A chat model rewrites them and the result is
//! posted to the content API.

pub mod audio;
pub mod espn;
pub mod llm;
pub mod publish;
pub mod replay;
pub mod session;

pub use audio::AudioAgent;
pub use espn::EspnClient;
pub use llm::{ChatClient, Prompt, TextModel, Transcriber};
pub use publish::{CommentaryEvent, ContentApi, Publisher};
pub use replay::ReplayAgent;
pub use session::AgentSession;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Event types understood by the live commentary feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FeedEventType {
    Goal,
    YellowCard,
    RedCard,
    Substitution,
    Corner,
    Foul,
    Save,
    Shot,
    Offside,
    Kickoff,
    Halftime,
    Fulltime,
    Highlight,
    Analysis,
    Info,
    #[default]
    #[serde(other)]
    Commentary,
}

impl FeedEventType {
    /// Map an ESPN key event name
    pub fn from_espn(name: &str) -> Self {
        match name {
            "Goal" => FeedEventType::Goal,
            "Yellow Card" => FeedEventType::YellowCard,
            "Red Card" => FeedEventType::RedCard,
            "Substitution" => FeedEventType::Substitution,
            "Corner" => FeedEventType::Corner,
            "Foul" => FeedEventType::Foul,
            "Save" => FeedEventType::Save,
            "Shot" => FeedEventType::Shot,
            "Offside" => FeedEventType::Offside,
            "Kickoff" | "Start 2nd Half" => FeedEventType::Kickoff,
            "Halftime" => FeedEventType::Halftime,
            "End Regular Time" | "Full Time" => FeedEventType::Fulltime,
            _ => FeedEventType::Commentary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedEventType::Goal => "goal",
            FeedEventType::YellowCard => "yellowCard",
            FeedEventType::RedCard => "redCard",
            FeedEventType::Substitution => "substitution",
            FeedEventType::Corner => "corner",
            FeedEventType::Foul => "foul",
            FeedEventType::Save => "save",
            FeedEventType::Shot => "shot",
            FeedEventType::Offside => "offside",
            FeedEventType::Kickoff => "kickoff",
            FeedEventType::Halftime => "halftime",
            FeedEventType::Fulltime => "fulltime",
            FeedEventType::Highlight => "highlight",
            FeedEventType::Analysis => "analysis",
            FeedEventType::Info => "info",
            FeedEventType::Commentary => "commentary",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            FeedEventType::Goal => "⚽",
            FeedEventType::YellowCard => "🟨",
            FeedEventType::RedCard => "🟥",
            FeedEventType::Substitution => "🔄",
            FeedEventType::Corner => "🚩",
            FeedEventType::Foul | FeedEventType::Offside => "🚫",
            FeedEventType::Save => "🧤",
            FeedEventType::Shot => "🎯",
            FeedEventType::Kickoff | FeedEventType::Info => "📢",
            FeedEventType::Halftime => "⏸️",
            FeedEventType::Fulltime => "🏁",
            FeedEventType::Highlight => "✨",
            FeedEventType::Analysis => "📊",
            FeedEventType::Commentary => "🎙️",
        }
    }
}

impl fmt::Display for FeedEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Teams, score and clock handed to the model with every event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchContext {
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    pub clock: String,
}

impl MatchContext {
    /// Used when the match summary cannot be fetched
    pub fn fallback() -> Self {
        MatchContext {
            home_team: "Home".to_string(),
            away_team: "Away".to_string(),
            home_score: 0,
            away_score: 0,
            clock: String::new(),
        }
    }

    pub fn score(&self) -> String {
        format!("{} - {}", self.home_score, self.away_score)
    }

    /// Credit a goal; any team other than the home side counts as away
    pub fn record_goal(&mut self, team: Option<&str>) {
        if team == Some(self.home_team.as_str()) {
            self.home_score += 1;
        } else {
            self.away_score += 1;
        }
    }
}

impl fmt::Display for MatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.home_team, self.score(), self.away_team)
    }
}
