//! Training data validation
//!
//! Every line is checked and every problem recorded; nothing aborts early.

use crate::Result;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const EXPECTED_ROLES: [&str; 3] = ["system", "user", "assistant"];

/// Outcome of validating one JSONL file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    /// Lines that parsed as JSON
    pub total_examples: usize,
    pub errors: Vec<String>,
    /// Average content length in chars for system, user and assistant messages
    pub avg_lengths: [f64; 3],
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn print(&self) {
        println!("Total examples: {}", self.total_examples);
        println!("Errors found: {}", self.errors.len());

        if !self.is_valid() {
            println!("\nErrors:");
            for error in self.errors.iter().take(10) {
                println!("  {}", error);
            }
            if self.errors.len() > 10 {
                println!("  ... and {} more", self.errors.len() - 10);
            }
            return;
        }

        println!("\nStatistics:");
        println!("  System message avg length: {:.1} chars", self.avg_lengths[0]);
        println!("  User prompt avg length: {:.1} chars", self.avg_lengths[1]);
        println!("  Assistant response avg length: {:.1} chars", self.avg_lengths[2]);
    }
}

/// Validate a JSONL file; a missing or unreadable file is an error
pub fn validate_file(path: &Path) -> Result<ValidationReport> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for line in reader.lines() {
        lines.push(line?);
    }
    Ok(validate_lines(lines.iter().map(String::as_str)))
}

pub fn validate_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut totals = [0usize; 3];
    let mut counts = [0usize; 3];

    for (i, line) in lines.into_iter().enumerate() {
        let n = i + 1;
        let example: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                report.errors.push(format!("Line {}: Invalid JSON - {}", n, e));
                continue;
            }
        };
        report.total_examples += 1;

        let Some(messages) = example.get("messages") else {
            report.errors.push(format!("Line {}: Missing 'messages' field", n));
            continue;
        };
        let Some(messages) = messages.as_array() else {
            report.errors.push(format!("Line {}: 'messages' is not a list", n));
            continue;
        };

        if messages.len() != 3 {
            report
                .errors
                .push(format!("Line {}: Expected 3 messages, got {}", n, messages.len()));
        }

        let roles: Vec<&str> = messages
            .iter()
            .map(|m| m.get("role").and_then(Value::as_str).unwrap_or(""))
            .collect();
        if roles != EXPECTED_ROLES {
            report
                .errors
                .push(format!("Line {}: Roles {:?} != {:?}", n, roles, EXPECTED_ROLES));
        }

        for (j, message) in messages.iter().enumerate() {
            match message.get("content").and_then(Value::as_str) {
                Some(content) if !content.is_empty() => {
                    if j < 3 {
                        totals[j] += content.chars().count();
                        counts[j] += 1;
                    }
                }
                _ => report
                    .errors
                    .push(format!("Line {}, message {}: Empty content", n, j)),
            }
        }
    }

    for k in 0..3 {
        if counts[k] > 0 {
            report.avg_lengths[k] = totals[k] as f64 / counts[k] as f64;
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"{"messages":[{"role":"system","content":"Persona"},{"role":"user","content":"Minute 12'"},{"role":"assistant","content":"Corner pour le Maroc"}]}"#;

    #[test]
    fn test_valid_file() {
        let report = validate_lines([GOOD, GOOD]);
        assert!(report.is_valid());
        assert_eq!(report.total_examples, 2);
        assert_eq!(report.avg_lengths[0], 7.0);
        assert_eq!(report.avg_lengths[2], 20.0);
    }

    #[test]
    fn test_errors_accumulate() {
        let swapped = r#"{"messages":[{"role":"user","content":"a"},{"role":"system","content":"b"},{"role":"assistant","content":""}]}"#;
        let report = validate_lines([GOOD, "{oops", r#"{"other":1}"#, swapped, GOOD]);

        assert!(!report.is_valid());
        assert_eq!(report.total_examples, 4);
        assert_eq!(report.errors.len(), 4);
        assert!(report.errors[0].starts_with("Line 2: Invalid JSON"));
        assert_eq!(report.errors[1], "Line 3: Missing 'messages' field");
        assert!(report.errors[2].starts_with("Line 4: Roles"));
        assert_eq!(report.errors[3], "Line 4, message 2: Empty content");
    }

    #[test]
    fn test_wrong_message_count() {
        let two = r#"{"messages":[{"role":"system","content":"a"},{"role":"user","content":"b"}]}"#;
        let report = validate_lines([two]);
        assert_eq!(report.errors[0], "Line 1: Expected 3 messages, got 2");
    }

    #[test]
    fn test_missing_file() {
        assert!(validate_file(Path::new("/nonexistent/training.jsonl")).is_err());
    }
}
