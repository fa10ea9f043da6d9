//! Corpus text handling: whitespace normalization, story and sentence splitting.

use once_cell::sync::Lazy;
use regex::Regex;

/// A divider line: only spaces, tabs and at least three dashes.
static DIVIDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*(?:-[ \t]*){3,}$").expect("divider pattern is valid"));

/// Terminal punctuation followed by a whitespace run.
static SENTENCE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("boundary pattern is valid"));

/// Collapse every whitespace run (newlines included) into a single space and trim.
///
/// Total and idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a raw corpus into stories on divider lines.
///
/// Returns the trimmed, non-empty segments between dividers in order. A corpus
/// without dividers is a single story; an empty or blank corpus has none.
pub fn split_stories(raw: &str) -> Vec<String> {
    let mut stories = Vec::new();
    let mut current = String::new();

    for line in raw.lines() {
        if DIVIDER.is_match(line.trim_end_matches('\r')) {
            push_trimmed(&mut stories, &current);
            current.clear();
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_trimmed(&mut stories, &current);

    stories
}

fn push_trimmed(out: &mut Vec<String>, segment: &str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Split a story into sentences after `.`, `!` or `?` followed by whitespace.
///
/// The punctuation stays with its sentence, the whitespace is dropped. No
/// abbreviation or decimal handling.
pub fn split_sentences(story: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_BOUNDARY.find_iter(story) {
        // The punctuation marks are all one byte wide.
        push_trimmed(&mut sentences, &story[start..boundary.start() + 1]);
        start = boundary.end();
    }
    push_trimmed(&mut sentences, &story[start..]);

    sentences
}

/// Whitespace-delimited token count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
