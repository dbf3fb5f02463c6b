//! Record assembly: the per-field state machine.
//!
//! ```text
//! Pending -> Resolving -> Normalized -> (Redacted) -> Finalized
//! ```
//!
//! Each field is attempted exactly once. There is no retry edge: a field
//! whose capture fails is normalized to `not_found` and finalized like any
//! other.

use std::collections::BTreeMap;

use formsift_core::{Confidence, NormalizedField, Record, Span};
use formsift_redact::{RedactionFilter, RedactionSummary};
use tracing::warn;

use crate::family::CompiledFamily;
use crate::normalize::{self, Normalized};
use crate::text::RawText;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Pending,
    Resolving,
    Normalized,
    Redacted,
    Finalized,
}

/// What a capture stage produced for one field, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: Option<String>,
    pub span: Option<Span>,
    pub confidence: Confidence,
}

impl Candidate {
    pub fn found(text: String, span: Span, confidence: Confidence) -> Self {
        Self {
            text: Some(text),
            span: Some(span),
            confidence,
        }
    }

    pub fn missing() -> Self {
        Self {
            text: None,
            span: None,
            confidence: Confidence::NotFound,
        }
    }
}

struct Slot {
    state: FieldState,
    candidate: Option<Candidate>,
    field: Option<NormalizedField>,
}

/// Fields of one document on their way to a [`Record`].
pub struct Assembly<'f> {
    family: &'f CompiledFamily,
    slots: Vec<Slot>,
}

impl<'f> Assembly<'f> {
    pub fn new(family: &'f CompiledFamily) -> Self {
        let slots = family
            .specs()
            .iter()
            .map(|_| Slot {
                state: FieldState::Pending,
                candidate: None,
                field: None,
            })
            .collect();
        Self { family, slots }
    }

    pub fn state(&self, field: usize) -> FieldState {
        self.slots[field].state
    }

    /// Open a field for resolution. Returns false if it was already attempted.
    pub fn begin(&mut self, field: usize) -> bool {
        let slot = &mut self.slots[field];
        if slot.state != FieldState::Pending {
            return false;
        }
        slot.state = FieldState::Resolving;
        true
    }

    /// Record the capture for a field opened with [`Assembly::begin`].
    pub fn resolve(&mut self, field: usize, candidate: Candidate) {
        let slot = &mut self.slots[field];
        if slot.state != FieldState::Resolving || slot.candidate.is_some() {
            warn!(
                "Ignoring second capture for {} in state {:?}",
                self.family.specs()[field].name,
                slot.state
            );
            return;
        }
        slot.candidate = Some(candidate);
    }

    /// Normalize every field. Fields never attempted count as not found.
    /// Returns how many fields hold a value.
    pub fn normalize(&mut self) -> usize {
        let mut resolved = 0;
        for (slot, spec) in self.slots.iter_mut().zip(self.family.specs()) {
            if !matches!(slot.state, FieldState::Pending | FieldState::Resolving) {
                continue;
            }
            let candidate = slot.candidate.take().unwrap_or_else(Candidate::missing);
            let field = match &candidate.text {
                None => NormalizedField::not_found(),
                Some(text) => match normalize::normalize(text, spec) {
                    Normalized::Value(value) => {
                        NormalizedField::resolved(value, candidate.confidence, candidate.span)
                    }
                    Normalized::Empty => NormalizedField::not_found(),
                    Normalized::Rejected => NormalizedField::invalid(
                        &normalize::clean_text(text).unwrap_or_default(),
                        candidate.span,
                    ),
                },
            };
            if field.is_resolved() {
                resolved += 1;
            }
            slot.field = Some(field.in_group(spec.group.as_deref()));
            slot.state = FieldState::Normalized;
        }
        resolved
    }

    /// Share of fields holding a value. Call after [`Assembly::normalize`]
    /// and before [`Assembly::redact`].
    pub fn completeness(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }
        let resolved = self
            .slots
            .iter()
            .filter(|s| s.field.as_ref().map_or(false, NormalizedField::is_resolved))
            .count();
        resolved as f64 / self.slots.len() as f64
    }

    pub fn redact(&mut self, filter: &RedactionFilter) -> RedactionSummary {
        let mut summary = RedactionSummary::default();
        for (slot, spec) in self.slots.iter_mut().zip(self.family.specs()) {
            let (FieldState::Normalized, Some(field)) = (slot.state, slot.field.as_mut()) else {
                continue;
            };
            if filter.apply_field(&spec.name, field) {
                slot.state = FieldState::Redacted;
                summary.redacted.push(spec.name.clone());
            } else {
                summary.disclosed += 1;
            }
        }
        summary
    }

    /// Close every field and build the record. Consumes the assembly so no
    /// finalized field can be reopened.
    pub fn finalize(mut self, document_id: &str, text: &RawText, completeness: f64) -> Record {
        let mut fields = BTreeMap::new();
        for (slot, spec) in self.slots.iter_mut().zip(self.family.specs()) {
            let field = slot
                .field
                .take()
                .unwrap_or_else(|| NormalizedField::not_found().in_group(spec.group.as_deref()));
            slot.state = FieldState::Finalized;
            fields.insert(spec.name.clone(), field);
        }
        Record {
            document_id: document_id.to_string(),
            family: self.family.name().to_string(),
            fields,
            completeness,
            content_digest: text.digest(),
            page_count: text.page_count(),
        }
    }
}
