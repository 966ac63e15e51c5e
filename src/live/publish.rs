//! Content API publishing

use super::FeedEventType;
use crate::{CommentaryError, LiveConfig, Result};
use serde::Serialize;
use std::time::Duration;

/// A commentary line ready to be posted
#[derive(Debug, Clone, PartialEq)]
pub struct CommentaryEvent {
    pub time: String,
    pub event_type: FeedEventType,
    pub text: String,
    pub team: Option<String>,
    pub player: Option<String>,
}

impl CommentaryEvent {
    pub fn new(time: &str, event_type: FeedEventType, text: &str) -> Self {
        CommentaryEvent {
            time: time.to_string(),
            event_type,
            text: text.to_string(),
            team: None,
            player: None,
        }
    }

    pub fn with_team(mut self, team: Option<&str>) -> Self {
        self.team = team.map(str::to_string);
        self
    }

    pub fn with_player(mut self, player: Option<&str>) -> Self {
        self.player = player.map(str::to_string);
        self
    }
}

/// Body of a POST to the live commentary endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostPayload {
    pub match_id: String,
    pub event_id: String,
    pub competition: String,
    pub time: String,
    pub time_seconds: u32,
    pub locale: String,
    pub text: String,
    #[serde(rename = "type")]
    pub event_type: FeedEventType,
    pub team: Option<String>,
    pub player_name: Option<String>,
    pub icon: String,
    pub is_scoring: bool,
    pub confidence: f32,
    pub source: String,
}

/// Destination for commentary payloads
pub trait Publisher {
    fn publish(&self, payload: &PostPayload) -> Result<()>;
}

pub struct ContentApi {
    client: reqwest::blocking::Client,
    url: String,
    webhook_secret: String,
}

impl ContentApi {
    pub fn from_config(config: &LiveConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("afcon-agent/0.1")
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(ContentApi {
            client,
            url: config.content_api_url.clone(),
            webhook_secret: config.webhook_secret.clone(),
        })
    }
}

impl Publisher for ContentApi {
    fn publish(&self, payload: &PostPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .header("x-webhook-secret", &self.webhook_secret)
            .json(payload)
            .send()?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(CommentaryError::Api {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            })
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Records payloads instead of sending them
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub posted: RefCell<Vec<PostPayload>>,
        pub fail: bool,
    }

    impl Publisher for RecordingPublisher {
        fn publish(&self, payload: &PostPayload) -> Result<()> {
            if self.fail {
                return Err(CommentaryError::Api {
                    status: 500,
                    body: "unavailable".into(),
                });
            }
            self.posted.borrow_mut().push(payload.clone());
            Ok(())
        }
    }
}
