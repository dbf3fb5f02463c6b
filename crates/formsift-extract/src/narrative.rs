//! Narrative capture: free prose bounded by start and end phrases.
//!
//! Phrases tolerate OCR line wrapping (any whitespace between words) and
//! case. The earliest start phrase in the document wins; ties go to the
//! phrase listed first. The nearest end phrase after the start closes the
//! body. Without one the body runs to a fixed window and is marked as a
//! degraded capture.

use std::ops::RangeInclusive;

use formsift_core::{Confidence, EngineLimits, Error, Result};
use regex::Regex;

use crate::text::RawText;

/// A phrase occurrence in the prepared text (byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseMatch {
    pub start: usize,
    pub end: usize,
    /// Position of the phrase in its list.
    pub priority: usize,
}

/// Case-insensitive, whitespace-tolerant phrase list in priority order.
#[derive(Debug, Clone)]
pub struct PhraseSet {
    patterns: Vec<Regex>,
}

impl PhraseSet {
    pub fn compile<S: AsRef<str>>(phrases: &[S]) -> Result<Self> {
        let patterns = phrases
            .iter()
            .map(|p| p.as_ref())
            .filter(|p| !p.trim().is_empty())
            .map(|p| {
                Regex::new(&phrase_pattern(p))
                    .map_err(|e| Error::Config(format!("bad phrase {:?}: {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Earliest match starting at or after `from`.
    pub fn earliest(&self, text: &str, from: usize) -> Option<PhraseMatch> {
        let mut best: Option<PhraseMatch> = None;
        for (priority, pattern) in self.patterns.iter().enumerate() {
            if let Some(m) = pattern.find_at(text, from) {
                if best.map_or(true, |b| m.start() < b.start) {
                    best = Some(PhraseMatch {
                        start: m.start(),
                        end: m.end(),
                        priority,
                    });
                }
            }
        }
        best
    }
}

fn phrase_pattern(phrase: &str) -> String {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    let mut pattern = String::from("(?i)");
    let trimmed = phrase.trim();
    if trimmed.chars().next().map_or(false, is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&words.join(r"\s+"));
    if trimmed.chars().next_back().map_or(false, is_word_char) {
        pattern.push_str(r"\b");
    }
    pattern
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// A captured narrative body.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeCapture {
    pub text: String,
    /// Byte offsets of the body within the prepared text.
    pub start: usize,
    pub end: usize,
    pub confidence: Confidence,
}

/// Outcome of a phrase-bounded search.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Found(NarrativeCapture),
    /// A start phrase matched but nothing followed it.
    Empty,
    NoStart,
}

#[derive(Debug, Clone)]
pub struct NarrativeDetector {
    start: PhraseSet,
    end: PhraseSet,
}

impl NarrativeDetector {
    pub fn new<S: AsRef<str>>(start_phrases: &[S], end_phrases: &[S]) -> Result<Self> {
        Ok(Self {
            start: PhraseSet::compile(start_phrases)?,
            end: PhraseSet::compile(end_phrases)?,
        })
    }

    /// Body between the earliest start phrase and the nearest end phrase.
    /// Neither marker is part of the body.
    pub fn detect(&self, text: &str, max_chars: usize) -> Detection {
        let Some(start) = self.start.earliest(text, 0) else {
            return Detection::NoStart;
        };
        let body_start = start.end;

        let (body_end, confidence) = match self.end.earliest(text, body_start) {
            Some(end) => (end.start, Confidence::Narrative),
            None => (window_end(text, body_start, max_chars), Confidence::Fallback),
        };

        match trimmed_capture(text, body_start, body_end, confidence) {
            Some(capture) => Detection::Found(capture),
            None => Detection::Empty,
        }
    }
}

/// Body for a document with no recognizable start phrase: the first run of
/// prose after the header fields. It ends at the next labelled line (a
/// footer field such as the date) or the first signature cue.
///
/// `labelled` holds the line ranges the label pass captured. Lines above
/// the first of them are title lines. Unlabelled lines that look like
/// leftover headers (short or all capitals) are skipped.
pub fn fallback_body(
    text: &RawText,
    labelled: &[RangeInclusive<usize>],
    signature_cues: &PhraseSet,
    limits: &EngineLimits,
) -> Option<NarrativeCapture> {
    let is_labelled = |line: usize| labelled.iter().any(|range| range.contains(&line));
    let first = labelled.iter().map(|range| *range.start()).min().unwrap_or(0);

    let stop = (first..text.len())
        .find(|&line| !is_labelled(line) && starts_with_cue(text.line(line), signature_cues))
        .unwrap_or(text.len());

    let body_line = (first..stop)
        .find(|&line| !is_labelled(line) && is_prose(text.line(line), limits.min_prose_chars))?;
    let end_line = (body_line..stop).find(|&line| is_labelled(line)).unwrap_or(stop);

    let body_start = text.line_start(body_line);
    let end_offset = if end_line < text.len() {
        text.line_start(end_line).saturating_sub(1)
    } else {
        text.text().len()
    };
    let window = window_end(text.text(), body_start, limits.max_narrative_chars);
    trimmed_capture(
        text.text(),
        body_start,
        end_offset.min(window),
        Confidence::Fallback,
    )
}

fn starts_with_cue(line: &str, cues: &PhraseSet) -> bool {
    cues.earliest(line, 0)
        .map_or(false, |m| !line[..m.start].chars().any(char::is_alphanumeric))
}

fn is_prose(line: &str, min_chars: usize) -> bool {
    if line.chars().count() < min_chars {
        return false;
    }
    let mut letters = line.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && !letters.all(|c| c.is_uppercase())
}

/// Byte offset `max_chars` characters past `from`, clamped to the text.
fn window_end(text: &str, from: usize, max_chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(max_chars)
        .map_or(text.len(), |(i, _)| from + i)
}

fn trimmed_capture(
    text: &str,
    start: usize,
    end: usize,
    confidence: Confidence,
) -> Option<NarrativeCapture> {
    if end <= start {
        return None;
    }
    let body = &text[start..end];
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lead = body.len() - body.trim_start().len();
    Some(NarrativeCapture {
        text: trimmed.to_string(),
        start: start + lead,
        end: start + lead + trimmed.len(),
        confidence,
    })
}
