//! Label dictionary: every field's surface forms, matched case-insensitively.

use formsift_core::{FieldRole, LabelSpec};

/// One label occurrence inside a lower-cased line. Offsets are bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelHit {
    /// Index of the field in the family's label table.
    pub field: usize,
    pub start: usize,
    pub end: usize,
}

impl LabelHit {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    fn overlaps(&self, other: &LabelHit) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone)]
struct Entry {
    /// Lower-cased, longest first.
    variants: Vec<String>,
    labelled: bool,
}

/// All label variants of a family, indexed by field position.
///
/// Stop phrases (signature-block cues) sit after the fields: they never
/// locate anything but end every block capture.
#[derive(Debug, Clone)]
pub struct LabelDictionary {
    entries: Vec<Entry>,
    fields: usize,
}

impl LabelDictionary {
    pub fn new(specs: &[LabelSpec]) -> Self {
        let entries: Vec<Entry> = specs
            .iter()
            .map(|spec| Entry {
                variants: prepare_variants(&spec.variants),
                labelled: spec.role != FieldRole::Narrative,
            })
            .collect();
        Self {
            fields: entries.len(),
            entries,
        }
    }

    pub fn with_stop_phrases<S: AsRef<str>>(mut self, phrases: &[S]) -> Self {
        let variants = prepare_variants(phrases);
        if !variants.is_empty() {
            self.entries.push(Entry {
                variants,
                labelled: false,
            });
        }
        self
    }

    /// Number of fields (stop phrases excluded).
    pub fn len(&self) -> usize {
        self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields == 0
    }

    /// Label hits of labelled fields on a lower-cased line, in line order.
    pub fn hits(&self, lower: &str) -> Vec<LabelHit> {
        self.scan(lower, false)
    }

    /// Whether a line starts a different field's territory: it carries a
    /// label of another field, a narrative start phrase or a stop phrase.
    pub fn terminates(&self, lower: &str, own_field: usize) -> bool {
        self.scan(lower, true).iter().any(|hit| hit.field != own_field)
    }

    /// Collect every bounded occurrence, then let longer hits shadow the
    /// shorter ones they overlap.
    fn scan(&self, lower: &str, include_narrative: bool) -> Vec<LabelHit> {
        let mut found = Vec::new();
        for (field, entry) in self.entries.iter().enumerate() {
            if !entry.labelled && !include_narrative {
                continue;
            }
            for variant in &entry.variants {
                for start in find_bounded(lower, variant) {
                    found.push(LabelHit {
                        field,
                        start,
                        end: start + variant.len(),
                    });
                }
            }
        }

        found.sort_by(|a, b| b.len().cmp(&a.len()).then(a.start.cmp(&b.start)));
        let mut kept: Vec<LabelHit> = Vec::with_capacity(found.len());
        for hit in found {
            if !kept.iter().any(|k| k.overlaps(&hit)) {
                kept.push(hit);
            }
        }
        kept.sort_by_key(|h| h.start);
        kept
    }
}

/// Lower-case, collapse inner whitespace, longest first.
fn prepare_variants<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut variants: Vec<String> = raw
        .iter()
        .map(|v| v.as_ref().split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .collect();
    variants.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    variants.dedup();
    variants
}

/// Start offsets of `needle` in `haystack` not glued to surrounding words.
///
/// An alphanumeric first (last) character of the needle requires a
/// non-alphanumeric character, or the line edge, before (after) the match.
pub fn find_bounded<'a>(haystack: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    let check_before = needle.chars().next().map_or(false, char::is_alphanumeric);
    let check_after = needle.chars().next_back().map_or(false, char::is_alphanumeric);
    haystack
        .match_indices(needle)
        .map(|(start, _)| start)
        .filter(move |&start| {
            let end = start + needle.len();
            let before_ok = !check_before
                || haystack[..start].chars().next_back().map_or(true, |c| !c.is_alphanumeric());
            let after_ok = !check_after
                || haystack[end..].chars().next().map_or(true, |c| !c.is_alphanumeric());
            before_ok && after_ok
        })
}
