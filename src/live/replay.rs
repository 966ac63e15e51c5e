//! Match replay: rebuild a commentary feed from ESPN data

use super::espn::{KeyEvent, MatchSummary};
use super::llm::{Prompt, TextModel};
use super::publish::{CommentaryEvent, Publisher};
use super::session::AgentSession;
use super::{FeedEventType, MatchContext};
use crate::stop::StopFlag;
use std::time::Duration;

const SYSTEM_PROMPT: &str = "Tu es un commentateur sportif africain passionné. Réponds uniquement avec le commentaire, sans guillemets ni préfixes.";

const MIN_COMMENTARY_CHARS: usize = 50;
const MAX_COMMENTARY_ITEMS: usize = 15;

/// Longest pause between two events, whatever the speed
pub const MAX_PAUSE: Duration = Duration::from_secs(60);

/// ESPN event names already covered by the synthetic kickoff
const SKIPPED_EVENTS: &[&str] = &["Kickoff", "Start 2nd Half"];

/// An event as presented to the model
struct RawEvent<'a> {
    kind: &'a str,
    time: &'a str,
    text: &'a str,
    team: Option<&'a str>,
    players: Vec<String>,
}

fn event_prompt(event: &RawEvent, ctx: &MatchContext) -> String {
    let players = if event.players.is_empty() {
        "N/A".to_string()
    } else {
        event.players.join(", ")
    };

    format!(
        "Tu es un COMMENTATEUR SPORTIF PASSIONNÉ pour Afrique Sports !

Match: {home} vs {away}
Score: {score}
Minute: {time}

Événement:
- Type: {kind}
- Équipe: {team}
- Joueurs: {players}
- Description ESPN: {text}

TRANSFORME cet événement en commentaire SENSATIONNEL en français !

RÈGLES:
- Écris comme un commentateur PASSIONNÉ africain qui vit le match
- Utilise des EXCLAMATIONS et de l'ÉMOTION !
- Minimum 120 caractères, maximum 300
- Ajoute 3-5 emojis pertinents
- Mentionne les joueurs concernés si disponibles
- Pour les BUTS: sois EXPLOSIF et mentionne le buteur !
- Pour les cartons: montre la tension du match
- Pour les remplacements: petite analyse tactique

Réponds UNIQUEMENT avec le texte du commentaire (pas de JSON, pas de guillemets).",
        home = ctx.home_team,
        away = ctx.away_team,
        score = ctx.score(),
        time = event.time,
        kind = event.kind,
        team = event.team.unwrap_or("N/A"),
        players = players,
        text = event.text,
    )
}

/// Pause of `secs` at replay speed `speed`; a non-positive speed means no pause
pub fn replay_delay(secs: f64, speed: f64) -> Duration {
    if speed.is_nan() || speed <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs / speed)
        .unwrap_or(MAX_PAUSE)
        .min(MAX_PAUSE)
}

pub struct ReplayAgent<'a> {
    model: &'a dyn TextModel,
    publisher: &'a dyn Publisher,
    speed: f64,
    include_commentary: bool,
    stop: StopFlag,
}

impl<'a> ReplayAgent<'a> {
    pub fn new(model: &'a dyn TextModel, publisher: &'a dyn Publisher) -> Self {
        ReplayAgent {
            model,
            publisher,
            speed: 1.0,
            include_commentary: true,
            stop: StopFlag::new(),
        }
    }

    /// Higher is faster; delays are divided by this factor
    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn include_commentary(mut self, include: bool) -> Self {
        self.include_commentary = include;
        self
    }

    pub fn with_stop(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// False once the replay has been stopped
    fn pause(&self, secs: f64) -> bool {
        self.stop.sleep(replay_delay(secs, self.speed))
    }

    /// Model rewrite, or the raw event text when the model fails
    fn rewrite(&self, event: &RawEvent, ctx: &MatchContext) -> String {
        let prompt = Prompt::new(SYSTEM_PROMPT, &event_prompt(event, ctx));
        match self.model.complete(&prompt) {
            Ok(text) if !text.trim().is_empty() => return text,
            Ok(_) => log::warn!("Empty model answer for {} event, using raw text", event.kind),
            Err(e) => log::warn!("Model failed for {} event ({}), using raw text", event.kind, e),
        }

        if event.text.is_empty() {
            format!("{} - {}", event.kind, event.team.unwrap_or_default())
        } else {
            event.text.to_string()
        }
    }

    fn emit(&self, session: &mut AgentSession, event: CommentaryEvent) {
        if let Err(e) = session.post(self.publisher, &event) {
            log::error!("Failed to post {} event at {}: {}", event.event_type, event.time, e);
        }
    }

    fn key_event(&self, session: &mut AgentSession, event: &KeyEvent, ctx: &mut MatchContext) -> bool {
        let kind = event.kind.text.as_str();
        let team = event.team_name();
        let players = event.players();
        let time = event.clock.display_value.as_str();

        if kind == "Goal" {
            ctx.record_goal(team);
        }
        log::info!("{} - {}{}", time, kind, team.map(|t| format!(" ({})", t)).unwrap_or_default());

        let raw = RawEvent {
            kind,
            time,
            text: &event.text,
            team,
            players: players.clone(),
        };
        let text = self.rewrite(&raw, ctx);
        self.emit(
            session,
            CommentaryEvent::new(time, FeedEventType::from_espn(kind), &text)
                .with_team(team)
                .with_player(players.first().map(String::as_str)),
        );

        self.pause(if kind == "Goal" { 0.8 } else { 0.4 })
    }

    /// Replay a whole match; returns the number of events posted.
    ///
    /// A stopped replay ends after the current event and posts no full time.
    pub fn replay(&self, session: &mut AgentSession, summary: &MatchSummary) -> usize {
        let final_ctx = summary.context();
        let mut ctx = MatchContext {
            home_score: 0,
            away_score: 0,
            ..final_ctx.clone()
        };
        let before = session.posted_count();

        log::info!("Replaying {} vs {}", ctx.home_team, ctx.away_team);
        log::info!(
            "Key events: {}, commentary: {}",
            summary.key_events.len(),
            summary.commentary.len()
        );

        let kickoff_text = format!(
            "Le match commence entre {} et {}",
            ctx.home_team, ctx.away_team
        );
        let kickoff = RawEvent {
            kind: "Kickoff",
            time: "0'",
            text: &kickoff_text,
            team: None,
            players: Vec::new(),
        };
        let text = self.rewrite(&kickoff, &ctx);
        self.emit(session, CommentaryEvent::new("0'", FeedEventType::Kickoff, &text));
        let mut running = self.pause(0.5);

        for event in &summary.key_events {
            if !running {
                break;
            }
            if SKIPPED_EVENTS.contains(&event.kind.text.as_str()) {
                continue;
            }
            running = self.key_event(session, event, &mut ctx);
        }

        if running && self.include_commentary {
            let selected = summary
                .commentary
                .iter()
                .filter(|item| item.text.chars().count() > MIN_COMMENTARY_CHARS)
                .take(MAX_COMMENTARY_ITEMS);

            for item in selected {
                if !running {
                    break;
                }
                let time = item.display_time();
                let raw = RawEvent {
                    kind: "Commentary",
                    time: &time,
                    text: &item.text,
                    team: None,
                    players: Vec::new(),
                };
                let text = self.rewrite(&raw, &ctx);
                self.emit(session, CommentaryEvent::new(&time, FeedEventType::Commentary, &text));
                running = self.pause(0.3);
            }
        }

        if !running {
            let posted = session.posted_count() - before;
            log::info!("Replay stopped by user: {} events posted", posted);
            return posted;
        }

        let fulltime_text = format!("C'EST TERMINÉ ! {}", final_ctx);
        let fulltime = RawEvent {
            kind: "Full Time",
            time: "90'",
            text: &fulltime_text,
            team: None,
            players: Vec::new(),
        };
        let text = self.rewrite(&fulltime, &final_ctx);
        self.emit(session, CommentaryEvent::new("90'", FeedEventType::Fulltime, &text));

        let posted = session.posted_count() - before;
        log::info!("Match replay complete: {}", final_ctx);
        log::info!("Events posted: {}", posted);
        posted
    }
}
