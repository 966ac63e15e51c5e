//! Manual review of filtered commentary before export
//!
//! Progress lives in a state file so a review can be stopped and picked up
//! later. Decisions are appended to the approved and rejected files as they
//! are made.

use super::dataset::{self, PromptStyle};
use crate::{CommentaryEntry, CommentaryError, Result};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

pub const STATE_FILE: &str = "review_state.json";
pub const APPROVED_FILE: &str = "approved_commentary.json";
pub const REJECTED_FILE: &str = "rejected_commentary.json";
pub const DEFAULT_REJECTION_REASON: &str = "Quality issues";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Approved,
    Rejected,
    Edited,
}

/// An entry with the reviewer's decision attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewedEntry {
    #[serde(flatten)]
    pub entry: CommentaryEntry,
    pub status: ReviewStatus,
    pub reviewed_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewState {
    pub current_index: usize,
    pub approved_count: usize,
    pub rejected_count: usize,
    pub edited_count: usize,
    pub entries: Vec<CommentaryEntry>,
}

impl ReviewState {
    pub fn reviewed(&self) -> usize {
        self.approved_count + self.rejected_count
    }

    /// Approved share of reviewed entries, in percent; edits count as approved
    pub fn approval_rate(&self) -> f64 {
        match self.reviewed() {
            0 => 0.0,
            n => self.approved_count as f64 / n as f64 * 100.0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.entries.len().saturating_sub(self.current_index)
    }
}

/// Review progress over one input file, persisted in a data directory
pub struct ReviewSession {
    dir: PathBuf,
    state: ReviewState,
}

impl ReviewSession {
    /// Resume the saved review in `dir`, if any
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(STATE_FILE);
        let state = if path.exists() {
            serde_json::from_str(&std::fs::read_to_string(&path)?)?
        } else {
            ReviewState::default()
        };
        Ok(ReviewSession {
            dir: dir.to_path_buf(),
            state,
        })
    }

    /// Start over on a new set of entries; counters are kept
    pub fn load_entries(&mut self, entries: Vec<CommentaryEntry>) -> Result<()> {
        log::info!("Loaded {} entries for review", entries.len());
        self.state.entries = entries;
        self.state.current_index = 0;
        self.save()
    }

    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    pub fn current(&self) -> Option<&CommentaryEntry> {
        self.state.entries.get(self.state.current_index)
    }

    pub fn approve(&mut self) -> Result<()> {
        let reviewed = self.decide(ReviewStatus::Approved, |_| {})?;
        self.append(APPROVED_FILE, reviewed)?;
        self.state.approved_count += 1;
        self.advance()
    }

    pub fn reject(&mut self, reason: Option<&str>) -> Result<()> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REJECTION_REASON)
            .to_string();
        let reviewed = self.decide(ReviewStatus::Rejected, |r| r.rejection_reason = Some(reason))?;
        self.append(REJECTED_FILE, reviewed)?;
        self.state.rejected_count += 1;
        self.advance()
    }

    /// Replace the text and approve; the old text is kept alongside
    pub fn edit(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentaryError::Parse("edited text is empty".into()));
        }
        let reviewed = self.decide(ReviewStatus::Edited, |r| {
            r.original_text = Some(std::mem::replace(&mut r.entry.text, text.to_string()));
        })?;
        self.append(APPROVED_FILE, reviewed)?;
        self.state.approved_count += 1;
        self.state.edited_count += 1;
        self.advance()
    }

    pub fn skip(&mut self) -> Result<()> {
        self.advance()
    }

    /// Write approved and edited entries as a training file
    pub fn export_approved(&self, out: &Path, style: PromptStyle, system_prompt: &str) -> Result<usize> {
        let approved: Vec<_> = read_reviewed(&self.dir.join(APPROVED_FILE))?
            .into_iter()
            .map(|r| r.entry)
            .collect();
        let examples = dataset::export(&approved, style, system_prompt);
        dataset::write_jsonl(out, &examples)
    }

    fn decide(&self, status: ReviewStatus, amend: impl FnOnce(&mut ReviewedEntry)) -> Result<ReviewedEntry> {
        let entry = self
            .current()
            .cloned()
            .ok_or_else(|| CommentaryError::Parse("no entry left to review".into()))?;
        let mut reviewed = ReviewedEntry {
            entry,
            status,
            reviewed_at: Utc::now().naive_utc(),
            rejection_reason: None,
            original_text: None,
        };
        amend(&mut reviewed);
        Ok(reviewed)
    }

    fn append(&self, file: &str, reviewed: ReviewedEntry) -> Result<()> {
        let path = self.dir.join(file);
        let mut all = read_reviewed(&path)?;
        all.push(reviewed);
        std::fs::write(&path, serde_json::to_string_pretty(&all)?)?;
        Ok(())
    }

    fn advance(&mut self) -> Result<()> {
        if self.state.current_index < self.state.entries.len() {
            self.state.current_index += 1;
        }
        self.save()
    }

    fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(STATE_FILE), serde_json::to_string_pretty(&self.state)?)?;
        Ok(())
    }
}

/// Entries in a decision file; a missing file has none
pub fn read_reviewed(path: &Path) -> Result<Vec<ReviewedEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

/// Prompt for a decision on each remaining entry.
///
/// Keys: `a` approve, `r` reject, `e` edit, `s` skip, `q` quit. End of input
/// quits as well.
pub fn run_interactive<R: BufRead, W: Write>(session: &mut ReviewSession, input: &mut R, out: &mut W) -> Result<()> {
    while let Some(entry) = session.current() {
        let state = session.state();
        writeln!(out, "\n[{}/{}] {} {}", state.current_index + 1, state.entries.len(), entry.time, entry.event_type)?;
        if let Some(label) = &entry.match_label {
            writeln!(out, "Match: {}", label)?;
        }
        writeln!(out, "{}", entry.text)?;
        write!(out, "(a)pprove (r)eject (e)dit (s)kip (q)uit > ")?;
        out.flush()?;

        let Some(choice) = read_line(input)? else { break };
        match choice.as_str() {
            "a" => session.approve()?,
            "r" => {
                write!(out, "Reason [{}]: ", DEFAULT_REJECTION_REASON)?;
                out.flush()?;
                let reason = read_line(input)?;
                session.reject(reason.as_deref())?;
            }
            "e" => {
                write!(out, "New text: ")?;
                out.flush()?;
                match read_line(input)? {
                    Some(text) if !text.is_empty() => session.edit(&text)?,
                    _ => writeln!(out, "Empty text, entry left as is")?,
                }
            }
            "s" => session.skip()?,
            "q" => break,
            other => writeln!(out, "Unknown choice: {}", other)?,
        }
    }

    let state = session.state();
    writeln!(out, "\nReviewed: {}", state.reviewed())?;
    writeln!(out, "  Approved: {} ({} edited)", state.approved_count, state.edited_count)?;
    writeln!(out, "  Rejected: {}", state.rejected_count)?;
    writeln!(out, "  Approval rate: {:.1}%", state.approval_rate())?;
    writeln!(out, "  Remaining: {}", state.remaining())?;
    Ok(())
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
