//! ESPN public match summary API

use super::MatchContext;
use crate::{CommentaryError, Result};
use serde::{Deserialize, Deserializer};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchSummary {
    pub header: Header,
    pub key_events: Vec<KeyEvent>,
    pub commentary: Vec<CommentaryItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Header {
    pub competitions: Vec<Competition>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Competition {
    pub competitors: Vec<Competitor>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Competitor {
    pub team: Team,
    #[serde(deserialize_with = "score_value")]
    pub score: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Team {
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Status {
    pub display_clock: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Clock {
    pub display_value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventKind {
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Participant {
    pub athlete: Team,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeyEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub clock: Clock,
    pub text: String,
    pub team: Option<Team>,
    pub participants: Vec<Participant>,
}

impl KeyEvent {
    pub fn team_name(&self) -> Option<&str> {
        self.team
            .as_ref()
            .map(|t| t.display_name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn players(&self) -> Vec<String> {
        self.participants
            .iter()
            .map(|p| p.athlete.display_name.clone())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentaryItem {
    pub clock: Option<Clock>,
    pub time: Option<Clock>,
    pub text: String,
}

impl CommentaryItem {
    pub fn display_time(&self) -> String {
        self.clock
            .as_ref()
            .or(self.time.as_ref())
            .map(|c| c.display_value.clone())
            .unwrap_or_default()
    }
}

/// ESPN sends scores as strings ("2") in summaries and numbers elsewhere
fn score_value<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_u64().unwrap_or(0) as u32,
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

impl MatchSummary {
    /// Teams, final score and current clock
    pub fn context(&self) -> MatchContext {
        let mut ctx = MatchContext::fallback();
        let Some(comp) = self.header.competitions.first() else {
            return ctx;
        };

        if let Some(home) = comp.competitors.first() {
            ctx.home_team = home.team.display_name.clone();
            ctx.home_score = home.score;
        }
        if let Some(away) = comp.competitors.get(1) {
            ctx.away_team = away.team.display_name.clone();
            ctx.away_score = away.score;
        }
        if let Some(status) = comp.status.as_ref().or(self.header.status.as_ref()) {
            ctx.clock = status.display_clock.clone();
        }
        ctx
    }
}

pub struct EspnClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl EspnClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("afcon-agent/0.1")
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(EspnClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn summary_url(&self, match_id: &str) -> String {
        format!("{}/summary?event={}", self.base_url, match_id)
    }

    pub fn summary(&self, match_id: &str) -> Result<MatchSummary> {
        let url = self.summary_url(match_id);
        log::debug!("Fetching ESPN summary: {}", url);

        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(CommentaryError::Api {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(response.json()?)
    }

    /// Current context, or placeholder teams when ESPN is unreachable
    pub fn context_or_fallback(&self, match_id: &str) -> MatchContext {
        match self.summary(match_id) {
            Ok(summary) => summary.context(),
            Err(e) => {
                log::warn!("Match context unavailable: {}", e);
                MatchContext::fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY: &str = r#"{
        "header": {"competitions": [{
            "competitors": [
                {"team": {"displayName": "Morocco"}, "score": "2"},
                {"team": {"displayName": "Comoros"}, "score": 0}
            ],
            "status": {"displayClock": "90'+4'"}
        }]},
        "keyEvents": [
            {"type": {"text": "Kickoff"}, "clock": {"displayValue": "0'"}, "text": "Start"},
            {"type": {"text": "Goal"}, "clock": {"displayValue": "55'"},
             "text": "Goal! Morocco 1, Comoros 0. Brahim Díaz.",
             "team": {"displayName": "Morocco"},
             "participants": [{"athlete": {"displayName": "Brahim Díaz"}}]},
            {"type": {"text": "Yellow Card"}, "clock": {"displayValue": "61'"},
             "text": "Booking", "team": {"displayName": "Comoros"}}
        ],
        "commentary": [
            {"time": {"displayValue": "12'"}, "text": "Corner, Morocco. Conceded by Youssouf M'Changama after a long spell of pressure."},
            {"clock": {"displayValue": "13'"}, "text": "Short one."}
        ]
    }"#;

    #[test]
    fn test_parse_summary() {
        let summary: MatchSummary = serde_json::from_str(SUMMARY).unwrap();
        let ctx = summary.context();
        assert_eq!(ctx.home_team, "Morocco");
        assert_eq!(ctx.score(), "2 - 0");
        assert_eq!(ctx.clock, "90'+4'");

        assert_eq!(summary.key_events.len(), 3);
        assert_eq!(summary.key_events[1].players(), vec!["Brahim Díaz"]);
        assert_eq!(summary.key_events[0].team_name(), None);
        assert_eq!(summary.commentary[0].display_time(), "12'");
        assert_eq!(summary.commentary[1].display_time(), "13'");
    }

    #[test]
    fn test_empty_summary_falls_back() {
        let summary: MatchSummary = serde_json::from_str("{}").unwrap();
        assert_eq!(summary.context(), MatchContext::fallback());
    }

    #[test]
    fn test_summary_url() {
        let client = EspnClient::new("https://site.api.espn.com/apis/site/v2/sports/soccer/caf.nations/").unwrap();
        assert_eq!(
            client.summary_url("732178"),
            "https://site.api.espn.com/apis/site/v2/sports/soccer/caf.nations/summary?event=732178"
        );
    }
}
