//! The extractor: one document in, one record (or failure) out.

use std::ops::RangeInclusive;
use std::sync::Arc;

use formsift_core::{
    Confidence, ExtractionFailure, FamilyConfig, FamilyRegistry, FieldRole, Record, Result, Span,
};
use formsift_redact::RedactionFilter;
use tracing::{debug, info};

use crate::assemble::{Assembly, Candidate};
use crate::block::capture_block;
use crate::family::CompiledFamily;
use crate::locator::LabelLocator;
use crate::narrative::{fallback_body, Detection, NarrativeCapture};
use crate::same_line::extract_same_line;
use crate::text::RawText;

/// Extracts records for one document family. Cheap to clone and safe to
/// share across threads; each call is a single pass with no I/O.
#[derive(Debug, Clone)]
pub struct Extractor {
    family: Arc<CompiledFamily>,
    redaction: RedactionFilter,
}

impl Extractor {
    pub fn new(config: FamilyConfig) -> Result<Self> {
        Ok(Self::from_compiled(Arc::new(CompiledFamily::compile(config)?)))
    }

    pub fn for_family(registry: &FamilyRegistry, family: &str) -> Result<Self> {
        Self::new(registry.get(family)?.clone())
    }

    pub fn from_compiled(family: Arc<CompiledFamily>) -> Self {
        let redaction = RedactionFilter::new(&family.config().redaction);
        Self { family, redaction }
    }

    pub fn family(&self) -> &CompiledFamily {
        &self.family
    }

    /// Extract a record from OCR text.
    pub fn extract(&self, document_id: &str, text: &str) -> std::result::Result<Record, ExtractionFailure> {
        let raw = RawText::prepare(document_id, text)
            .map_err(|e| ExtractionFailure::new(document_id, e.to_string()))?;
        Ok(self.extract_prepared(document_id, &raw))
    }

    /// Extract a record from raw bytes, which must be UTF-8.
    pub fn extract_bytes(
        &self,
        document_id: &str,
        bytes: &[u8],
    ) -> std::result::Result<Record, ExtractionFailure> {
        let raw = RawText::from_bytes(document_id, bytes)
            .map_err(|e| ExtractionFailure::new(document_id, e.to_string()))?;
        Ok(self.extract_prepared(document_id, &raw))
    }

    /// Run every field once over prepared text. Never fails: misses and
    /// rejected values are recorded per field.
    pub fn extract_prepared(&self, document_id: &str, text: &RawText) -> Record {
        let family = &*self.family;
        let mut assembly = Assembly::new(family);
        let mut locator = LabelLocator::new(family.dictionary(), text);
        let mut labelled: Vec<RangeInclusive<usize>> = Vec::new();

        for (index, spec) in family.specs().iter().enumerate() {
            if !spec.role.is_labelled() || !assembly.begin(index) {
                continue;
            }
            let (candidate, lines) = self.resolve_labelled(index, text, &mut locator);
            labelled.extend(lines);
            debug!("{}: {}", spec.name, candidate.confidence);
            assembly.resolve(index, candidate);
        }

        let mut primary_narrative = true;
        for (index, spec) in family.specs().iter().enumerate() {
            if spec.role != FieldRole::Narrative || !assembly.begin(index) {
                continue;
            }
            let candidate = self.resolve_narrative(index, text, &labelled, primary_narrative);
            primary_narrative = false;
            debug!("{}: {}", spec.name, candidate.confidence);
            assembly.resolve(index, candidate);
        }

        let resolved = assembly.normalize();
        let completeness = assembly.completeness();
        let redaction = assembly.redact(&self.redaction);
        let record = assembly.finalize(document_id, text, completeness);

        info!(
            "Extracted {} as {}: {}/{} fields, {} redacted, completeness {:.2}",
            document_id,
            family.name(),
            resolved,
            family.specs().len(),
            redaction.redacted.len(),
            completeness
        );
        record
    }

    /// Label pass for one field: same line, then block, then patterns.
    /// Also returns the lines a label capture used.
    fn resolve_labelled(
        &self,
        index: usize,
        text: &RawText,
        locator: &mut LabelLocator<'_>,
    ) -> (Candidate, Option<RangeInclusive<usize>>) {
        let family = &*self.family;
        let spec = &family.specs()[index];
        let max_lines = family.config().limits.max_block_lines;

        if let Some(location) = locator.locate(index) {
            let same_line = extract_same_line(locator.segment(&location), locator.label_text(&location));
            let candidate = match same_line {
                Some(value) => Some(Candidate::found(
                    value,
                    Span::lines(location.line, location.line),
                    Confidence::SameLine,
                )),
                None => capture_block(text, family.dictionary(), index, location.line, max_lines)
                    .map(|block| {
                        locator.consume(block.start_line, block.end_line);
                        let confidence = if block.truncated {
                            debug!("{}: block capture hit the {} line cap", spec.name, max_lines);
                            Confidence::Fallback
                        } else {
                            Confidence::Block
                        };
                        Candidate::found(
                            block.lines.join("\n"),
                            Span::lines(location.line, block.end_line),
                            confidence,
                        )
                    }),
            };

            match candidate {
                Some(candidate) => {
                    let lines = candidate.span.map(|s| s.start_line..=s.end_line);
                    return (candidate, lines);
                }
                None => debug!("{}: label on line {} has no value", spec.name, location.line),
            }
        }

        (self.pattern_fallback(index, text), None)
    }

    /// First pattern whose capture group holds something.
    fn pattern_fallback(&self, index: usize, text: &RawText) -> Candidate {
        for pattern in self.family.patterns(index) {
            let Some(group) = pattern.captures(text.text()).and_then(|c| c.get(1)) else {
                continue;
            };
            let value = group.as_str().trim();
            if value.is_empty() {
                continue;
            }
            let span = Span {
                start_line: text.line_of(group.start()),
                end_line: text.line_of(group.end()),
                start_offset: Some(group.start()),
                end_offset: Some(group.end()),
            };
            return Candidate::found(value.to_string(), span, Confidence::Fallback);
        }
        Candidate::missing()
    }

    fn resolve_narrative(
        &self,
        index: usize,
        text: &RawText,
        labelled: &[RangeInclusive<usize>],
        primary: bool,
    ) -> Candidate {
        let family = &*self.family;
        let limits = &family.config().limits;
        let Some(detector) = family.narrative(index) else {
            return Candidate::missing();
        };

        let capture = match detector.detect(text.text(), limits.max_narrative_chars) {
            Detection::Found(capture) => Some(capture),
            Detection::Empty => None,
            Detection::NoStart if primary => {
                fallback_body(text, labelled, family.signature_cues(), limits)
            }
            Detection::NoStart => None,
        };

        match capture {
            Some(capture) => narrative_candidate(text, capture),
            None => Candidate::missing(),
        }
    }
}

fn narrative_candidate(text: &RawText, capture: NarrativeCapture) -> Candidate {
    let span = Span {
        start_line: text.line_of(capture.start),
        end_line: text.line_of(capture.end.saturating_sub(1).max(capture.start)),
        start_offset: Some(capture.start),
        end_offset: Some(capture.end),
    };
    Candidate::found(capture.text, span, capture.confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formsift_core::{FieldValue, LabelSpec, RedactionPolicy, ValueKind};

    fn extractor(labels: Vec<LabelSpec>) -> Extractor {
        Extractor::new(FamilyConfig::new("test", labels)).unwrap()
    }

    #[test]
    fn test_same_line_and_block() {
        let ex = extractor(vec![
            LabelSpec::new("name", &["Name"], FieldRole::Scalar),
            LabelSpec::new("address", &["Address"], FieldRole::Block).with_kind(ValueKind::Address),
            LabelSpec::new("age", &["Age"], FieldRole::Scalar).with_kind(ValueKind::Integer),
        ]);
        let record = ex
            .extract("d", "Name: Sita Devi\nAddress:\n12 Gandhi Road\nKanpur\nAge: 30")
            .unwrap();
        assert_eq!(record.value("name"), Some(&FieldValue::Text("Sita Devi".into())));
        assert_eq!(record.confidence("name"), Some(Confidence::SameLine));
        assert_eq!(
            record.value("address"),
            Some(&FieldValue::Text("12 Gandhi Road, Kanpur".into()))
        );
        assert_eq!(record.confidence("address"), Some(Confidence::Block));
        assert_eq!(record.field("address").unwrap().span, Some(Span::lines(1, 3)));
        assert_eq!(record.value("age"), Some(&FieldValue::Integer(30)));
    }

    #[test]
    fn test_same_line_value_ends_block_and_list_fields() {
        let ex = extractor(vec![
            LabelSpec::new("residing_at", &["Residing at"], FieldRole::Block)
                .with_kind(ValueKind::Address),
            LabelSpec::new("samples", &["Samples collected"], FieldRole::List),
        ]);
        let record = ex
            .extract(
                "d",
                "Residing at: Mohalla Qazi, Bareilly\nOn the evening of 2nd March I saw two men.\nSamples collected: Blood\n\u{2022} Swab",
            )
            .unwrap();
        assert_eq!(
            record.value("residing_at"),
            Some(&FieldValue::Text("Mohalla Qazi, Bareilly".into()))
        );
        assert_eq!(record.confidence("residing_at"), Some(Confidence::SameLine));
        assert_eq!(record.field("residing_at").unwrap().span, Some(Span::lines(0, 0)));
        assert_eq!(record.value("samples"), Some(&FieldValue::List(vec!["Blood".into()])));
        assert_eq!(record.confidence("samples"), Some(Confidence::SameLine));
    }

    #[test]
    fn test_list_label_alone_reads_lines_below() {
        let ex = extractor(vec![
            LabelSpec::new("samples", &["Samples collected"], FieldRole::List),
            LabelSpec::new("opinion", &["Opinion"], FieldRole::Scalar),
        ]);
        let record = ex
            .extract("d", "Samples collected:\n\u{2022} Swab\n\u{2022} Blood\n\u{2022} Swab\nOpinion: pending")
            .unwrap();
        assert_eq!(
            record.value("samples"),
            Some(&FieldValue::List(vec!["Swab".into(), "Blood".into()]))
        );
        assert_eq!(record.confidence("samples"), Some(Confidence::Block));
    }

    #[test]
    fn test_scalar_label_alone_reads_next_line() {
        let ex = extractor(vec![LabelSpec::new("name", &["Name"], FieldRole::Scalar)]);
        let record = ex.extract("d", "Name\nRavi Kumar\n\nother").unwrap();
        assert_eq!(record.value("name"), Some(&FieldValue::Text("Ravi Kumar".into())));
        assert_eq!(record.confidence("name"), Some(Confidence::Block));
    }

    #[test]
    fn test_pattern_fallback() {
        let ex = extractor(vec![LabelSpec::new("age", &["Age"], FieldRole::Scalar)
            .with_kind(ValueKind::Integer)
            .with_patterns(&[r"(?i)\baged\s+(\d{1,3})"])]);
        let record = ex.extract("d", "The witness, aged 32, stated").unwrap();
        assert_eq!(record.value("age"), Some(&FieldValue::Integer(32)));
        assert_eq!(record.confidence("age"), Some(Confidence::Fallback));
    }

    #[test]
    fn test_redaction_and_completeness() {
        let mut config = FamilyConfig::new(
            "test",
            vec![
                LabelSpec::new("name", &["Name"], FieldRole::Scalar),
                LabelSpec::new("age", &["Age"], FieldRole::Scalar).with_kind(ValueKind::Integer),
            ],
        );
        config.redaction = RedactionPolicy::withholding(&["name"]);
        let record = Extractor::new(config).unwrap().extract("d", "Name: John Doe\nAge: 34\n").unwrap();
        assert!(record.value("name").is_none());
        assert_eq!(record.confidence("name"), Some(Confidence::Redacted));
        assert_eq!(record.value("age"), Some(&FieldValue::Integer(34)));
        assert_eq!(record.completeness, 1.0);
    }

    #[test]
    fn test_narrative_fallback_after_header() {
        let mut config = FamilyConfig::new(
            "test",
            vec![
                LabelSpec::new("name", &["Name"], FieldRole::Scalar),
                LabelSpec::new("statement", &["I do hereby state"], FieldRole::Narrative),
            ],
        );
        config.signature_cues = vec!["Signature".into()];
        let record = Extractor::new(config)
            .unwrap()
            .extract(
                "d",
                "Name: Ravi\nSTATEMENT\nI was at the market when the shop was broken into.\nSignature",
            )
            .unwrap();
        assert_eq!(
            record.value("statement"),
            Some(&FieldValue::Text("I was at the market when the shop was broken into.".into()))
        );
        assert_eq!(record.confidence("statement"), Some(Confidence::Fallback));
        let span = record.field("statement").unwrap().span.unwrap();
        assert_eq!((span.start_line, span.end_line), (2, 2));
    }

    #[test]
    fn test_failure_on_empty_and_undecodable() {
        let ex = extractor(vec![LabelSpec::new("name", &["Name"], FieldRole::Scalar)]);
        let failure = ex.extract("empty-doc", "").unwrap_err();
        assert_eq!(failure.completeness, 0.0);
        assert_eq!(failure.document_id, "empty-doc");
        assert!(ex.extract_bytes("bad", &[0xc3, 0x28]).is_err());
    }
}
