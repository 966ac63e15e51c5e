//! OpenAI-compatible chat completion and transcription clients

use crate::{CommentaryError, LiveConfig, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One system + user exchange, with optional sampling overrides
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Prompt {
    pub fn new(system: &str, user: &str) -> Self {
        Prompt {
            system: system.to_string(),
            user: user.to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Anything that answers a prompt with text
pub trait TextModel {
    fn complete(&self, prompt: &Prompt) -> Result<String>;
}

/// Read the provider key; a missing key stops the agent before any work
pub fn api_key_from_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(CommentaryError::Config(format!(
            "{} environment variable not set",
            var
        ))),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .user_agent("afcon-agent/0.1")
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Fail with the status and body on a non-success response
fn check(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(CommentaryError::Api {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        })
    }
}

pub struct ChatClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

impl ChatClient {
    pub fn from_config(config: &LiveConfig) -> Result<Self> {
        let api_key = api_key_from_env(&config.api_key_env)?;
        Ok(ChatClient {
            client: http_client(60)?,
            base_url: config.model_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TextModel for ChatClient {
    fn complete(&self, prompt: &Prompt) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: prompt.max_tokens.unwrap_or(self.max_tokens),
            temperature: prompt.temperature.unwrap_or(self.temperature),
            top_p: self.top_p,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;
        let body: ChatResponse = check(response)?.json()?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| CommentaryError::Parse("chat response has no content".into()))
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Speech-to-text through the `/audio/transcriptions` endpoint
pub struct Transcriber {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl Transcriber {
    pub fn from_config(config: &LiveConfig) -> Result<Self> {
        Ok(Transcriber {
            client: http_client(120)?,
            base_url: config.model_base_url.trim_end_matches('/').to_string(),
            api_key: api_key_from_env(&config.api_key_env)?,
            model: config.transcription_model.clone(),
        })
    }

    /// Transcribe a French audio file; silence yields an empty string
    pub fn transcribe(&self, audio: &Path) -> Result<String> {
        let form = reqwest::blocking::multipart::Form::new()
            .text("model", self.model.clone())
            .text("language", "fr")
            .text("response_format", "json")
            .file("file", audio)?;

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()?;
        let body: TranscriptionResponse = check(response)?.json()?;
        Ok(body.text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_config_error() {
        let err = api_key_from_env("AFCON_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert!(matches!(err, CommentaryError::Config(_)));
        assert!(err.to_string().contains("AFCON_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![
                ChatMessage { role: "system", content: "persona" },
                ChatMessage { role: "user", content: "Minute 12'" },
            ],
            max_tokens: 200,
            temperature: 0.7,
            top_p: 0.9,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 200);
    }

    #[test]
    fn test_prompt_overrides() {
        let prompt = Prompt::new("s", "u").temperature(0.5).max_tokens(1000);
        assert_eq!(prompt.temperature, Some(0.5));
        assert_eq!(prompt.max_tokens, Some(1000));
    }
}
