//! Text preparation: line endings, control characters, page breaks.
//!
//! Everything downstream works on [`RawText`], a line-indexed view of the
//! prepared document. Lower-casing is ASCII-only so byte offsets found in the
//! lower-cased lines are valid in the original ones.

use formsift_core::{Error, Result};
use sha2::{Digest, Sha256};

/// Separator the OCR stage inserts between pages.
pub const PAGE_BREAK: &str = "---PAGE_BREAK---";

/// Prepared document text, split into lines.
#[derive(Debug, Clone)]
pub struct RawText {
    text: String,
    lines: Vec<String>,
    lower: Vec<String>,
    /// Byte offset of each line's first character in `text`.
    offsets: Vec<usize>,
    page_count: usize,
}

impl RawText {
    /// Prepare OCR output for extraction. Fails on input with no visible text.
    pub fn prepare(document_id: &str, input: &str) -> Result<Self> {
        let unified = input
            .replace("\r\n", "\n")
            .replace('\r', "\n")
            .replace('\u{000C}', &format!("\n{}\n", PAGE_BREAK));

        let mut lines = Vec::new();
        let mut page_count = 1;
        for line in unified.split('\n') {
            let cleaned = clean_line(line);
            if is_page_break(&cleaned) {
                page_count += 1;
                continue;
            }
            lines.push(cleaned);
        }

        if lines.iter().all(|l| l.is_empty()) {
            return Err(Error::EmptyInput(document_id.to_string()));
        }

        let mut offsets = Vec::with_capacity(lines.len());
        let mut position = 0;
        for line in &lines {
            offsets.push(position);
            position += line.len() + 1;
        }

        Ok(Self {
            text: lines.join("\n"),
            lower: lines.iter().map(|l| l.to_ascii_lowercase()).collect(),
            lines,
            offsets,
            page_count,
        })
    }

    /// Decode then prepare. Invalid UTF-8 is a document defect, not a panic.
    pub fn from_bytes(document_id: &str, bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| Error::Undecodable(document_id.to_string()))?;
        Self::prepare(document_id, text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, index: usize) -> &str {
        &self.lines[index]
    }

    /// ASCII-lower-cased copy of a line, byte-aligned with [`RawText::line`].
    pub fn lower(&self, index: usize) -> &str {
        &self.lower[index]
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_blank(&self, index: usize) -> bool {
        self.lines[index].is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Byte offset where a line starts; `text().len()` past the last line.
    pub fn line_start(&self, index: usize) -> usize {
        self.offsets.get(index).copied().unwrap_or(self.text.len())
    }

    /// Line containing a byte offset of `text()`.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.offsets.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        }
    }

    /// SHA-256 of the prepared text (hex).
    pub fn digest(&self) -> String {
        content_hash(&self.text)
    }
}

/// Compute SHA-256 content hash.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Drop control characters, collapse runs of blanks, trim.
fn clean_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut pending_space = false;
    for c in line.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if c.is_control() || c == '\u{FEFF}' {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

fn is_page_break(line: &str) -> bool {
    let core = line.trim_matches('-').trim();
    !core.is_empty()
        && line.starts_with("---")
        && (core.eq_ignore_ascii_case("page_break") || core.eq_ignore_ascii_case("page break"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_normalizes_lines() {
        let raw = RawText::prepare("d", "Name:\t John   Doe \r\nAge: 34\rEnd").unwrap();
        assert_eq!(raw.lines(), &["Name: John Doe", "Age: 34", "End"]);
        assert_eq!(raw.text(), "Name: John Doe\nAge: 34\nEnd");
    }

    #[test]
    fn test_control_characters_are_dropped() {
        let raw = RawText::prepare("d", "Na\u{0007}me: X\u{0000}").unwrap();
        assert_eq!(raw.line(0), "Name: X");
    }

    #[test]
    fn test_page_breaks_are_counted_and_removed() {
        let input = "Page one\n\n---PAGE_BREAK---\n\nPage two\n\u{000C}Page three";
        let raw = RawText::prepare("d", input).unwrap();
        assert_eq!(raw.page_count(), 3);
        assert!(!raw.text().contains("PAGE_BREAK"));
        assert!(raw.text().contains("Page three"));
    }

    #[test]
    fn test_blank_input_is_rejected() {
        let err = RawText::prepare("doc-7", "  \n\t\n").unwrap_err();
        assert!(matches!(err, Error::EmptyInput(id) if id == "doc-7"));
        assert!(RawText::prepare("doc-8", "").is_err());
    }

    #[test]
    fn test_invalid_utf8_is_undecodable() {
        let err = RawText::from_bytes("doc-9", &[0x4e, 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, Error::Undecodable(_)));
    }

    #[test]
    fn test_offsets_and_line_lookup() {
        let raw = RawText::prepare("d", "ab\ncde\n\nf").unwrap();
        assert_eq!(raw.line_start(1), 3);
        assert_eq!(raw.line_start(3), 8);
        assert_eq!(raw.line_of(4), 1);
        assert_eq!(raw.line_of(7), 2);
        assert_eq!(raw.line_start(10), raw.text().len());
    }

    #[test]
    fn test_lowercase_is_byte_aligned() {
        let raw = RawText::prepare("d", "NAMÉ: Ünal").unwrap();
        assert_eq!(raw.lower(0).len(), raw.line(0).len());
        assert!(raw.lower(0).starts_with("nam"));
    }

    #[test]
    fn test_digest_is_stable() {
        let a = RawText::prepare("a", "Name: X\r\n").unwrap();
        let b = RawText::prepare("b", "Name:   X\n").unwrap();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }
}
