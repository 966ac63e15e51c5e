//! Live audio agent: stream chunks, transcription, extracted events

use super::espn::EspnClient;
use super::llm::{Prompt, TextModel, Transcriber};
use super::publish::{CommentaryEvent, Publisher};
use super::session::AgentSession;
use super::{FeedEventType, MatchContext};
use crate::commentary::dedup::preview;
use crate::stop::StopFlag;
use crate::{CommentaryError, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;

const SYSTEM_PROMPT: &str =
    "Tu es un commentateur sportif passionné. Réponds uniquement en JSON valide.";

/// Events below this importance are dropped
pub const MIN_IMPORTANCE: f64 = 2.0;

/// Stream formats tried in order; "91" is the lowest YouTube live HLS variant
const STREAM_FORMATS: &[&str] = &["91", "bestaudio[ext=m4a]", "bestaudio"];

/// Wait after a failed cycle
const ERROR_BACKOFF: Duration = Duration::from_secs(10);
const POST_INTERVAL: Duration = Duration::from_millis(300);

/// Speech-to-text backend
pub trait SpeechToText {
    fn transcribe(&self, audio: &Path) -> Result<String>;
}

impl SpeechToText for Transcriber {
    fn transcribe(&self, audio: &Path) -> Result<String> {
        Transcriber::transcribe(self, audio)
    }
}

fn default_importance() -> f64 {
    5.0
}

/// Models sometimes send `null` where a value is expected
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One event as returned by the model
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedEvent {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub event_type: FeedEventType,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default = "default_importance")]
    pub importance: f64,
}

impl ExtractedEvent {
    pub fn is_significant(&self) -> bool {
        self.importance >= MIN_IMPORTANCE && !self.text.trim().is_empty()
    }

    /// Feed event, stamped with `clock` when the model gave no time
    pub fn to_event(&self, clock: &str) -> CommentaryEvent {
        let time = self
            .time
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(clock);
        CommentaryEvent::new(time, self.event_type, &self.text)
            .with_team(self.team.as_deref())
            .with_player(self.player.as_deref())
    }
}

fn json_object_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("valid JSON object regex"))
}

/// Pull `{"events": [...]}` out of a model answer, tolerating markdown
/// fences and chatter around the object. Unparseable answers give no events;
/// a malformed item is skipped without losing the others.
pub fn parse_events(content: &str) -> Vec<ExtractedEvent> {
    let Some(m) = json_object_regex().find(content) else {
        log::warn!("No JSON object in model answer");
        return Vec::new();
    };

    let items = match serde_json::from_str::<Value>(m.as_str()) {
        Ok(Value::Object(mut object)) => match object.remove("events") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        Ok(_) => return Vec::new(),
        Err(e) => {
            log::warn!("Unparseable events from model: {}", e);
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<ExtractedEvent>(item) {
            Ok(event) => Some(event),
            Err(e) => {
                log::warn!("Skipping malformed event {}: {}", i, e);
                None
            }
        })
        .collect()
}

pub fn extraction_prompt(transcription: &str, ctx: &MatchContext, chunk_secs: u64) -> String {
    format!(
        r#"Tu es un COMMENTATEUR SPORTIF PASSIONNÉ pour Afrique Sports ! Tu retranscris les commentaires audio avec ÉNERGIE et SENSATIONNALISME !

Match: {home} vs {away}
Score actuel: {score}

Transcription audio ({secs}s):
"{transcription}"

TA MISSION: Transformer cette transcription en commentaires SENSATIONNELS !

RÈGLE CRITIQUE POUR LES BUTS:
- UTILISE "type": "goal" UNIQUEMENT si le commentateur dit EXPLICITEMENT "but", "goal", "il marque", "c'est le but", "1-0", "2-0", etc.
- Si c'est juste une action excitante, un tir, une occasion ratée, utilise "highlight" ou "shot", PAS "goal"
- NE PAS INVENTER de buts ! Sois FIDÈLE à ce que dit la transcription.
- En cas de doute, utilise "commentary" ou "highlight"

STYLE À ADOPTER:
- Écris comme un commentateur PASSIONNÉ qui vit le match
- Utilise des EXCLAMATIONS variées et de l'ÉMOTION !
- Minimum 150 caractères par commentaire
- BEAUCOUP d'emojis

Réponds UNIQUEMENT en JSON valide (sans markdown, sans backticks):
{{"events": [{{"type": "shot|foul|yellowCard|redCard|corner|substitution|save|offside|commentary|analysis|highlight|goal", "time": "{clock}", "text": "Commentaire SENSATIONNEL avec emojis !", "player": null, "team": null, "importance": 5}}]}}

RAPPEL: "goal" = SEULEMENT si un but est CONFIRMÉ dans la transcription !"#,
        home = ctx.home_team,
        away = ctx.away_team,
        score = ctx.score(),
        secs = chunk_secs,
        transcription = transcription,
        clock = ctx.clock,
    )
}

/// Record `secs` seconds of a stream to an mp3 in `work_dir`.
///
/// Tries each stream format with yt-dlp and converts to 16 kHz mono when the
/// download is not already mp3.
pub fn capture_chunk(url: &str, work_dir: &Path, secs: u64) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
    let template = work_dir.join(format!("chunk_{}.%(ext)s", stamp));

    for format in STREAM_FORMATS {
        let status = Command::new("yt-dlp")
            .arg("-f")
            .arg(format)
            .args(["--downloader", "ffmpeg"])
            .arg("--downloader-args")
            .arg(format!("ffmpeg:-t {}", secs))
            .args(["-x", "--audio-format", "mp3", "--audio-quality", "64K"])
            .arg("-o")
            .arg(&template)
            .args(["--no-playlist", "--no-part", "--quiet"])
            .arg(url)
            .status()?;

        if !status.success() {
            log::debug!("yt-dlp format {} failed ({})", format, status);
            continue;
        }

        if let Some(file) = find_chunk(work_dir, &stamp)? {
            return to_mp3(&file);
        }
    }

    Err(CommentaryError::Parse(format!(
        "no audio captured from {}",
        url
    )))
}

fn find_chunk(work_dir: &Path, stamp: &str) -> Result<Option<PathBuf>> {
    let prefix = format!("chunk_{}", stamp);
    for entry in std::fs::read_dir(work_dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(&prefix));
        if matches {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn to_mp3(file: &Path) -> Result<PathBuf> {
    if file.extension().is_some_and(|ext| ext == "mp3") {
        return Ok(file.to_path_buf());
    }

    let target = file.with_extension("mp3");
    let status = Command::new("ffmpeg")
        .arg("-i")
        .arg(file)
        .args(["-ar", "16000", "-ac", "1", "-b:a", "64k", "-y", "-loglevel", "error"])
        .arg(&target)
        .status()?;
    let _ = std::fs::remove_file(file);

    if status.success() {
        Ok(target)
    } else {
        Err(CommentaryError::Parse(format!(
            "ffmpeg conversion failed for {}",
            file.display()
        )))
    }
}

pub struct AudioAgent<'a> {
    model: &'a dyn TextModel,
    publisher: &'a dyn Publisher,
    speech: &'a dyn SpeechToText,
    espn: &'a EspnClient,
    chunk_secs: u64,
    work_dir: PathBuf,
    stop: StopFlag,
}

impl<'a> AudioAgent<'a> {
    pub fn new(
        model: &'a dyn TextModel,
        publisher: &'a dyn Publisher,
        speech: &'a dyn SpeechToText,
        espn: &'a EspnClient,
        chunk_secs: u64,
    ) -> Self {
        AudioAgent {
            model,
            publisher,
            speech,
            espn,
            chunk_secs,
            work_dir: std::env::temp_dir().join(format!("afcon-audio-{}", std::process::id())),
            stop: StopFlag::new(),
        }
    }

    pub fn with_stop(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    fn chunk_pause(&self) -> Duration {
        Duration::from_secs(self.chunk_secs.saturating_sub(5))
    }

    /// Ask the model for events in one transcription
    pub fn extract_events(&self, transcription: &str, ctx: &MatchContext) -> Result<Vec<ExtractedEvent>> {
        let prompt = Prompt::new(
            SYSTEM_PROMPT,
            &extraction_prompt(transcription, ctx, self.chunk_secs),
        )
        .temperature(0.5)
        .max_tokens(1000);

        let answer = self.model.complete(&prompt)?;
        Ok(parse_events(&answer))
    }

    /// Post the significant events; returns how many went out
    pub fn post_events(
        &self,
        session: &mut AgentSession,
        events: &[ExtractedEvent],
        ctx: &MatchContext,
        interval: Duration,
    ) -> usize {
        let mut posted = 0;
        for event in events.iter().filter(|e| e.is_significant()) {
            match session.post(self.publisher, &event.to_event(&ctx.clock)) {
                Ok(true) => posted += 1,
                Ok(false) => {}
                Err(e) => log::error!("Failed to post {} event: {}", event.event_type, e),
            }
            std::thread::sleep(interval);
        }
        posted
    }

    /// Transcribe an audio chunk, extract its events and post them
    pub fn process_chunk(&self, session: &mut AgentSession, audio: &Path, ctx: &MatchContext) -> Result<usize> {
        let transcription = self.speech.transcribe(audio)?;
        if transcription.is_empty() {
            log::info!("No speech detected");
            return Ok(0);
        }
        log::info!("Transcribed: \"{}\"", preview(&transcription, 100));

        let events = self.extract_events(&transcription, ctx)?;
        let posted = self.post_events(session, &events, ctx, POST_INTERVAL);
        if posted == 0 {
            log::info!("No significant events detected");
        } else {
            log::info!("Posted {} events", posted);
        }
        Ok(posted)
    }

    fn cycle(&self, session: &mut AgentSession, url: &str) -> Result<usize> {
        let ctx = self.espn.context_or_fallback(&session.match_id);
        log::info!("{} | {}", ctx.clock, ctx);

        let audio = capture_chunk(url, &self.work_dir, self.chunk_secs)?;
        let result = self.process_chunk(session, &audio, &ctx);
        let _ = std::fs::remove_file(&audio);
        result
    }

    /// Follow a stream chunk by chunk; stops after `max_chunks` when given
    pub fn run(&self, session: &mut AgentSession, url: &str, max_chunks: Option<usize>) -> Result<usize> {
        std::fs::create_dir_all(&self.work_dir)?;
        log::info!("Following {} in {}s chunks", url, self.chunk_secs);

        let mut total = 0;
        let mut chunks = 0;
        while !self.stop.is_stopped() && max_chunks.map_or(true, |max| chunks < max) {
            chunks += 1;
            let pause = match self.cycle(session, url) {
                Ok(posted) => {
                    total += posted;
                    self.chunk_pause()
                }
                Err(e) => {
                    log::error!("Chunk {} failed: {}", chunks, e);
                    ERROR_BACKOFF
                }
            };
            if !self.stop.sleep(pause) {
                break;
            }
        }

        let _ = std::fs::remove_dir_all(&self.work_dir);
        if self.stop.is_stopped() {
            log::info!("Stopped by user");
        }
        log::info!("Audio agent stopped after {} chunks, {} events posted", chunks, total);
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::publish::testing::RecordingPublisher;
    use std::cell::RefCell;

    struct CannedModel {
        answer: String,
        prompts: RefCell<Vec<Prompt>>,
    }

    impl TextModel for CannedModel {
        fn complete(&self, prompt: &Prompt) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.clone());
            Ok(self.answer.clone())
        }
    }

    struct FixedSpeech(&'static str);

    impl SpeechToText for FixedSpeech {
        fn transcribe(&self, _audio: &Path) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn ctx() -> MatchContext {
        MatchContext {
            home_team: "Egypt".into(),
            away_team: "Ivory Coast".into(),
            home_score: 1,
            away_score: 0,
            clock: "63'".into(),
        }
    }

    const ANSWER: &str = r#"```json
{"events": [
  {"type": "shot", "time": "62'", "text": "Quelle frappe de Salah ! Le gardien ivoirien s'envole !", "importance": 7},
  {"type": "commentary", "text": "Le ballon circule tranquillement.", "importance": 1},
  {"type": "dribble", "text": "Un crochet magnifique de Zizo sur le côté droit !"}
]}
```"#;

    #[test]
    fn test_parse_events_with_fences() {
        let events = parse_events(ANSWER);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].event_type, FeedEventType::Shot);
        assert_eq!(events[0].importance, 7.0);
        assert_eq!(events[1].importance, 1.0);
        // unknown types become commentary, missing importance defaults to 5
        assert_eq!(events[2].event_type, FeedEventType::Commentary);
        assert_eq!(events[2].importance, 5.0);
        assert_eq!(events[2].time, None);
    }

    #[test]
    fn test_bad_item_does_not_lose_the_chunk() {
        let answer = r#"{"events": [
  {"type": "goal", "time": null, "text": "BUUUT ! Salah ouvre le score !", "player": "Salah", "importance": 6.5},
  {"type": "shot", "time": "12'", "text": ["pas", "une", "chaîne"]},
  {"type": null, "text": "Corner pour la Côte d'Ivoire.", "importance": 3}
]}"#;
        let events = parse_events(answer);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, FeedEventType::Goal);
        assert_eq!(events[0].importance, 6.5);
        assert!(events[0].is_significant());
        assert_eq!(events[0].to_event("20'").time, "20'");
        assert_eq!(events[1].event_type, FeedEventType::Commentary);
        assert_eq!(events[1].text, "Corner pour la Côte d'Ivoire.");
    }

    #[test]
    fn test_parse_events_garbage() {
        assert!(parse_events("Désolé, je ne peux pas.").is_empty());
        assert!(parse_events("{not json}").is_empty());
        assert!(parse_events(r#"{"other": 1}"#).is_empty());
    }

    #[test]
    fn test_to_event_uses_clock_when_time_missing() {
        let events = parse_events(ANSWER);
        assert_eq!(events[0].to_event("63'").time, "62'");
        assert_eq!(events[2].to_event("63'").time, "63'");
    }

    #[test]
    fn test_prompt_carries_context() {
        let prompt = extraction_prompt("Salah frappe !", &ctx(), 30);
        assert!(prompt.contains("Match: Egypt vs Ivory Coast"));
        assert!(prompt.contains("Score actuel: 1 - 0"));
        assert!(prompt.contains("Transcription audio (30s)"));
        assert!(prompt.contains(r#""time": "63'""#));
    }

    #[test]
    fn test_process_chunk_filters_low_importance() {
        let model = CannedModel {
            answer: ANSWER.to_string(),
            prompts: RefCell::new(Vec::new()),
        };
        let publisher = RecordingPublisher::default();
        let speech = FixedSpeech("Salah frappe, le gardien s'envole");
        let espn = EspnClient::new("http://127.0.0.1:9").unwrap();
        let agent = AudioAgent::new(&model, &publisher, &speech, &espn, 30);
        let mut session = AgentSession::new("401", "CAN 2025", "hybrid", "youtube_audio").starting_at(500);

        let posted = agent
            .process_chunk(&mut session, Path::new("unused.mp3"), &ctx())
            .unwrap();

        assert_eq!(posted, 2);
        let payloads = publisher.posted.borrow();
        assert_eq!(payloads[0].event_id, "hybrid_501");
        assert_eq!(payloads[1].time, "63'");

        let prompts = model.prompts.borrow();
        assert_eq!(prompts[0].temperature, Some(0.5));
        assert_eq!(prompts[0].max_tokens, Some(1000));
    }

    #[test]
    fn test_silence_posts_nothing() {
        let model = CannedModel {
            answer: ANSWER.to_string(),
            prompts: RefCell::new(Vec::new()),
        };
        let publisher = RecordingPublisher::default();
        let speech = FixedSpeech("");
        let espn = EspnClient::new("http://127.0.0.1:9").unwrap();
        let agent = AudioAgent::new(&model, &publisher, &speech, &espn, 30);
        let mut session = AgentSession::new("401", "CAN 2025", "hybrid", "youtube_audio");

        assert_eq!(agent.process_chunk(&mut session, Path::new("x.mp3"), &ctx()).unwrap(), 0);
        assert!(model.prompts.borrow().is_empty());
    }

    #[test]
    fn test_stopped_agent_captures_nothing_and_cleans_up() {
        let model = CannedModel {
            answer: ANSWER.to_string(),
            prompts: RefCell::new(Vec::new()),
        };
        let publisher = RecordingPublisher::default();
        let speech = FixedSpeech("Salah frappe");
        let espn = EspnClient::new("http://127.0.0.1:9").unwrap();
        let stop = StopFlag::new();
        stop.stop();
        let agent = AudioAgent::new(&model, &publisher, &speech, &espn, 30).with_stop(stop);
        let mut session = AgentSession::new("401", "CAN 2025", "hybrid", "youtube_audio");

        assert_eq!(agent.run(&mut session, "https://youtube.com/live/x", None).unwrap(), 0);
        assert!(publisher.posted.borrow().is_empty());
        assert!(!agent.work_dir.exists());
    }
}
