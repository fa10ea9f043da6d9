//! Extracting the chosen option from model output.

use crate::generator::Label;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// A lone trailing `A` or `B`, optionally followed by a closing quote.
static TRAILING_CHOICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(A|B)\b["']?$"#).expect("trailing choice pattern is valid"));

/// What a model answered, as recorded in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Choice(Label),
    /// The model returned nothing.
    NoResponse,
    /// The model returned text with no recognizable final letter.
    ParseError,
}

impl Answer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Answer::Choice(label) => label.as_str(),
            Answer::NoResponse => "NO_RESPONSE",
            Answer::ParseError => "PARSE_ERROR",
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a normalized cell value (`" a "` counts as `A`).
pub fn parse_label(value: &str) -> Option<Label> {
    match value.trim().to_uppercase().as_str() {
        "A" => Some(Label::A),
        "B" => Some(Label::B),
        _ => None,
    }
}

/// Whether a dataset cell already holds a valid answer.
pub fn is_answered(cell: Option<&str>) -> bool {
    matches!(cell.map(str::trim), Some("A") | Some("B"))
}

/// Normalize a letter-only reply. Anything other than a letter is kept
/// verbatim (upper-cased) so scoring can report it.
pub fn normalize_plain(response: &str) -> String {
    response.trim().to_uppercase()
}

/// Split a reasoning response into its final answer and the reasoning text.
///
/// The answer is the last line that is exactly `A` or `B` (ignoring case,
/// whitespace and surrounding quotes); the reasoning is everything before it.
/// Failing that, a response ending in a standalone letter ("... is B") counts,
/// with the whole response kept as reasoning.
pub fn extract_answer_and_reasoning(response: &str) -> (Answer, String) {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return (Answer::NoResponse, String::new());
    }

    let lines: Vec<&str> = trimmed.split('\n').collect();
    for (i, line) in lines.iter().enumerate().rev() {
        let cleaned = line.trim().to_uppercase();
        let cleaned = cleaned.trim_matches('"').trim_matches('\'');
        if let Some(label) = parse_exact(cleaned) {
            let reasoning = lines[..i].join("\n").trim().to_string();
            return (Answer::Choice(label), reasoning);
        }
    }

    if let Some(caps) = TRAILING_CHOICE.captures(trimmed) {
        if let Some(label) = parse_label(&caps[1]) {
            return (Answer::Choice(label), trimmed.to_string());
        }
    }

    (Answer::ParseError, response.to_string())
}

fn parse_exact(value: &str) -> Option<Label> {
    match value {
        "A" => Some(Label::A),
        "B" => Some(Label::B),
        _ => None,
    }
}
