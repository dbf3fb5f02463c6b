//! Block capture: multi-line values beneath a label.

use crate::dictionary::LabelDictionary;
use crate::text::RawText;

/// Lines captured under a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCapture {
    pub lines: Vec<String>,
    pub start_line: usize,
    pub end_line: usize,
    /// The line cap cut the capture short.
    pub truncated: bool,
}

impl BlockCapture {
    /// Captured lines joined by single spaces.
    pub fn joined(&self) -> String {
        self.lines.join(" ")
    }
}

/// Collect the lines after `label_line` until a blank line, another field's
/// label, the end of text, or `max_lines`, whichever comes first.
pub fn capture_block(
    text: &RawText,
    dictionary: &LabelDictionary,
    field: usize,
    label_line: usize,
    max_lines: usize,
) -> Option<BlockCapture> {
    let start_line = label_line + 1;
    let mut lines = Vec::new();
    let mut truncated = false;

    for index in start_line..text.len() {
        if text.is_blank(index) || dictionary.terminates(text.lower(index), field) {
            break;
        }
        if lines.len() >= max_lines {
            truncated = true;
            break;
        }
        lines.push(text.line(index).to_string());
    }

    if lines.is_empty() {
        return None;
    }
    Some(BlockCapture {
        end_line: start_line + lines.len() - 1,
        start_line,
        lines,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use formsift_core::{FieldRole, LabelSpec};

    fn dictionary() -> LabelDictionary {
        LabelDictionary::new(&[
            LabelSpec::new("label_a", &["LabelA"], FieldRole::Block),
            LabelSpec::new("label_b", &["LabelB"], FieldRole::Block),
        ])
    }

    #[test]
    fn test_stops_at_next_label() {
        let text = RawText::prepare("d", "LabelA\nvalue1\nLabelB\nvalue2").unwrap();
        let block = capture_block(&text, &dictionary(), 0, 0, 50).unwrap();
        assert_eq!(block.joined(), "value1");
        assert_eq!((block.start_line, block.end_line), (1, 1));
        assert!(!block.truncated);
    }

    #[test]
    fn test_stops_at_blank_line() {
        let text = RawText::prepare("d", "LabelA\n12 Gandhi Road\nKanpur\n\nunrelated").unwrap();
        let block = capture_block(&text, &dictionary(), 0, 0, 50).unwrap();
        assert_eq!(block.joined(), "12 Gandhi Road Kanpur");
    }

    #[test]
    fn test_empty_block() {
        let text = RawText::prepare("d", "LabelA\n\nvalue").unwrap();
        assert!(capture_block(&text, &dictionary(), 0, 0, 50).is_none());
        let text = RawText::prepare("d", "LabelA").unwrap();
        assert!(capture_block(&text, &dictionary(), 0, 0, 50).is_none());
    }

    #[test]
    fn test_cap_bounds_capture() {
        let mut input = String::from("LabelA\n");
        for i in 0..10_000 {
            input.push_str(&format!("line {}\n", i));
        }
        let text = RawText::prepare("d", &input).unwrap();
        let block = capture_block(&text, &dictionary(), 0, 0, 50).unwrap();
        assert_eq!(block.lines.len(), 50);
        assert_eq!(block.end_line, 50);
        assert!(block.truncated);
    }

    #[test]
    fn test_exact_cap_is_not_truncated() {
        let text = RawText::prepare("d", "LabelA\na\nb\n\nc").unwrap();
        let block = capture_block(&text, &dictionary(), 0, 0, 2).unwrap();
        assert!(!block.truncated);
    }
}
