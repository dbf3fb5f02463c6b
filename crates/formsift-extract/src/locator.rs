//! Label location: which line (and which slice of it) belongs to a field.
//!
//! A line may carry several labels (`Name: X  Age: 34`). It is cut into
//! segments at each anchored label: the first label on the line, or any later
//! one followed by (or ending in) a separator. Unanchored mentions still locate their field
//! but do not split the line for others.

use crate::dictionary::{LabelDictionary, LabelHit};
use crate::same_line::{is_separator, separator_end};
use crate::text::RawText;

/// Where a field's label was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub hit: LabelHit,
    /// Byte offset where this label's segment ends.
    pub segment_end: usize,
}

pub struct LabelLocator<'a> {
    text: &'a RawText,
    hits: Vec<Vec<LabelHit>>,
    /// Segment boundaries per line (starts of anchored hits).
    anchors: Vec<Vec<usize>>,
    consumed: Vec<bool>,
}

impl<'a> LabelLocator<'a> {
    pub fn new(dictionary: &LabelDictionary, text: &'a RawText) -> Self {
        let mut hits = Vec::with_capacity(text.len());
        let mut anchors = Vec::with_capacity(text.len());
        for index in 0..text.len() {
            let lower = text.lower(index);
            let line_hits = dictionary.hits(lower);
            let line_anchors = line_hits
                .iter()
                .enumerate()
                .filter(|(i, hit)| {
                    *i == 0
                        || lower[hit.start..hit.end].ends_with(is_separator)
                        || separator_end(&lower[hit.end..]).is_some()
                })
                .map(|(_, hit)| hit.start)
                .collect();
            hits.push(line_hits);
            anchors.push(line_anchors);
        }
        Self {
            text,
            hits,
            anchors,
            consumed: vec![false; text.len()],
        }
    }

    /// First unconsumed line carrying one of the field's labels.
    pub fn locate(&self, field: usize) -> Option<Location> {
        (0..self.hits.len())
            .filter(|&line| !self.consumed[line])
            .find_map(|line| {
                let hit = *self.hits[line].iter().find(|h| h.field == field)?;
                let segment_end = self.anchors[line]
                    .iter()
                    .copied()
                    .find(|&start| start > hit.start)
                    .unwrap_or_else(|| self.text.line(line).len());
                Some(Location {
                    line,
                    hit,
                    segment_end,
                })
            })
    }

    /// The text of a located segment, label included.
    pub fn segment(&self, location: &Location) -> &'a str {
        &self.text.line(location.line)[location.hit.start..location.segment_end]
    }

    /// The label as written in the document.
    pub fn label_text(&self, location: &Location) -> &'a str {
        &self.text.line(location.line)[location.hit.start..location.hit.end]
    }

    /// Mark lines taken by a block capture so later fields skip them.
    pub fn consume(&mut self, start_line: usize, end_line: usize) {
        let end = end_line.min(self.consumed.len().saturating_sub(1));
        for line in start_line..=end {
            self.consumed[line] = true;
        }
    }

    pub fn is_consumed(&self, line: usize) -> bool {
        self.consumed.get(line).copied().unwrap_or(false)
    }
}
