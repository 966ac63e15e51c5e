//! Per-run agent state: event numbering and posted-event memory

use super::publish::{CommentaryEvent, PostPayload, Publisher};
use super::FeedEventType;
use crate::commentary::dedup::preview;
use crate::Result;
use std::collections::HashSet;

const KEY_TEXT_CHARS: usize = 30;
const CONFIDENCE: f32 = 0.95;

/// One agent run against one match
pub struct AgentSession {
    pub match_id: String,
    competition: String,
    /// Prefix of generated event ids, e.g. `replay_12`
    id_prefix: String,
    source: String,
    counter: u32,
    seen: HashSet<String>,
}

impl AgentSession {
    pub fn new(match_id: &str, competition: &str, id_prefix: &str, source: &str) -> Self {
        AgentSession {
            match_id: match_id.to_string(),
            competition: competition.to_string(),
            id_prefix: id_prefix.to_string(),
            source: source.to_string(),
            counter: 0,
            seen: HashSet::new(),
        }
    }

    /// Start numbering after `counter`, to keep ids apart from another agent
    pub fn starting_at(mut self, counter: u32) -> Self {
        self.counter = counter;
        self
    }

    pub fn posted_count(&self) -> usize {
        self.seen.len()
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn dedupe_key(event: &CommentaryEvent) -> String {
        let head: String = event.text.chars().take(KEY_TEXT_CHARS).collect();
        format!("{}_{}_{}", event.time, event.event_type, head)
    }

    fn payload(&self, event: &CommentaryEvent) -> PostPayload {
        PostPayload {
            match_id: self.match_id.clone(),
            event_id: format!("{}_{}", self.id_prefix, self.counter),
            competition: self.competition.clone(),
            time: event.time.clone(),
            time_seconds: self.counter,
            locale: "fr".to_string(),
            text: event.text.clone(),
            event_type: event.event_type,
            team: event.team.clone(),
            player_name: event.player.clone(),
            icon: event.event_type.icon().to_string(),
            is_scoring: event.event_type == FeedEventType::Goal,
            confidence: CONFIDENCE,
            source: self.source.clone(),
        }
    }

    /// Post an event unless an identical one already went out.
    ///
    /// Returns `Ok(false)` for a skipped duplicate. The key is remembered
    /// only after a successful post, so failures can be retried.
    pub fn post(&mut self, publisher: &dyn Publisher, event: &CommentaryEvent) -> Result<bool> {
        let key = Self::dedupe_key(event);
        if self.seen.contains(&key) {
            log::info!("Skipping duplicate event at {}", event.time);
            return Ok(false);
        }

        self.counter += 1;
        publisher.publish(&self.payload(event))?;
        self.seen.insert(key);
        log::info!("[{}] {}", event.time, preview(&event.text, 70));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::publish::testing::RecordingPublisher;

    fn session() -> AgentSession {
        AgentSession::new("732178", "CAN 2025", "replay", "espn_replay")
    }

    #[test]
    fn test_payload_fields() {
        let publisher = RecordingPublisher::default();
        let mut session = session();
        let event = CommentaryEvent::new("55'", FeedEventType::Goal, "BUUUT de Brahim Díaz !")
            .with_team(Some("Morocco"))
            .with_player(Some("Brahim Díaz"));

        assert!(session.post(&publisher, &event).unwrap());
        let posted = publisher.posted.borrow();
        let payload = &posted[0];
        assert_eq!(payload.event_id, "replay_1");
        assert_eq!(payload.time_seconds, 1);
        assert!(payload.is_scoring);
        assert_eq!(payload.icon, "⚽");
        assert_eq!(payload.locale, "fr");

        let json = serde_json::to_value(payload).unwrap();
        assert_eq!(json["type"], "goal");
        assert_eq!(json["player_name"], "Brahim Díaz");
        assert_eq!(json["match_id"], "732178");
    }

    #[test]
    fn test_duplicates_skipped() {
        let publisher = RecordingPublisher::default();
        let mut session = session().starting_at(500);
        let event = CommentaryEvent::new("30'", FeedEventType::Shot, "Frappe de Salah au-dessus de la barre");

        assert!(session.post(&publisher, &event).unwrap());
        assert!(!session.post(&publisher, &event).unwrap());
        assert_eq!(publisher.posted.borrow().len(), 1);
        assert_eq!(publisher.posted.borrow()[0].event_id, "replay_501");
        assert_eq!(session.posted_count(), 1);
    }

    #[test]
    fn test_failed_post_not_remembered() {
        let publisher = RecordingPublisher {
            fail: true,
            ..Default::default()
        };
        let mut session = session();
        let event = CommentaryEvent::new("30'", FeedEventType::Save, "Parade du gardien comorien");

        assert!(session.post(&publisher, &event).is_err());
        assert_eq!(session.posted_count(), 0);
        assert_eq!(session.counter(), 1);
    }

    #[test]
    fn test_dedupe_key() {
        let event = CommentaryEvent::new("12'", FeedEventType::Corner, &"é".repeat(50));
        assert_eq!(AgentSession::dedupe_key(&event), format!("12'_corner_{}", "é".repeat(30)));
    }
}
