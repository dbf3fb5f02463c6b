//! Extraction output — typed fields and the per-document record.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

/// How a field's value was obtained, or why it is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    SameLine,
    Block,
    Narrative,
    /// Lower-confidence result from a bounded degrade or pattern fallback.
    Fallback,
    NotFound,
    /// Captured, but rejected by type coercion.
    InvalidFormat,
    /// Withheld by the redaction policy.
    Redacted,
}

impl Confidence {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SameLine => "same_line",
            Self::Block => "block",
            Self::Narrative => "narrative",
            Self::Fallback => "fallback",
            Self::NotFound => "not_found",
            Self::InvalidFormat => "invalid_format",
            Self::Redacted => "redacted",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A well-typed field value. Missing values are `None` on the field, never an empty string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    /// Serialized as an ISO calendar date (`YYYY-MM-DD`).
    Date(NaiveDate),
    List(Vec<String>),
}

/// Where a value came from: inclusive line indices, plus byte offsets for narratives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_offset: Option<usize>,
}

impl Span {
    pub fn lines(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line,
            start_offset: None,
            end_offset: None,
        }
    }
}

/// A field after normalization (and possibly redaction).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedField {
    pub value: Option<FieldValue>,
    pub confidence: Confidence,
    /// Original capture, kept only when normalization rejected it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    #[serde(skip)]
    pub group: Option<String>,
}

impl NormalizedField {
    pub fn resolved(value: FieldValue, confidence: Confidence, span: Option<Span>) -> Self {
        Self {
            value: Some(value),
            confidence,
            raw: None,
            span,
            group: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            value: None,
            confidence: Confidence::NotFound,
            raw: None,
            span: None,
            group: None,
        }
    }

    pub fn invalid(raw: &str, span: Option<Span>) -> Self {
        Self {
            value: None,
            confidence: Confidence::InvalidFormat,
            raw: Some(raw.to_string()),
            span,
            group: None,
        }
    }

    pub fn in_group(mut self, group: Option<&str>) -> Self {
        self.group = group.map(str::to_string);
        self
    }

    /// Null the value and drop every trace of the capture.
    pub fn redact(&mut self) {
        self.value = None;
        self.raw = None;
        self.span = None;
        self.confidence = Confidence::Redacted;
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }
}

/// Structured result for one document. Immutable once assembled.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub document_id: String,
    pub family: String,
    pub fields: BTreeMap<String, NormalizedField>,
    /// Resolved fields / expected fields, measured before redaction.
    pub completeness: f64,
    /// SHA-256 of the prepared text (hex).
    pub content_digest: String,
    pub page_count: usize,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&NormalizedField> {
        self.fields.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).and_then(|f| f.value.as_ref())
    }

    pub fn confidence(&self, name: &str) -> Option<Confidence> {
        self.fields.get(name).map(|f| f.confidence)
    }

    /// Flat interchange form: values keyed by field name, nested only for
    /// sub-grouped fields, with a sibling map of confidence tags.
    pub fn to_output(&self) -> Value {
        let mut values = Map::new();
        let mut status = Map::new();

        for (name, field) in &self.fields {
            let value = match &field.value {
                Some(v) => serde_json::to_value(v).unwrap_or(Value::Null),
                None => Value::Null,
            };
            match &field.group {
                Some(group) => {
                    let entry = values
                        .entry(group.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(inner) = entry {
                        inner.insert(name.clone(), value);
                    }
                    status.insert(
                        format!("{}.{}", group, name),
                        Value::String(field.confidence.label().to_string()),
                    );
                }
                None => {
                    values.insert(name.clone(), value);
                    status.insert(
                        name.clone(),
                        Value::String(field.confidence.label().to_string()),
                    );
                }
            }
        }

        serde_json::json!({
            "document_id": self.document_id,
            "family": self.family,
            "completeness": self.completeness,
            "content_digest": self.content_digest,
            "page_count": self.page_count,
            "fields": values,
            "field_status": status,
        })
    }
}

/// Whole-document failure. No partial record accompanies it.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionFailure {
    pub document_id: String,
    pub completeness: f64,
    pub reason: String,
}

impl ExtractionFailure {
    pub fn new(document_id: &str, reason: impl Into<String>) -> Self {
        Self {
            document_id: document_id.to_string(),
            completeness: 0.0,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "extraction failed for {}: {}", self.document_id, self.reason)
    }
}

impl std::error::Error for ExtractionFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> Record {
        let mut fields = BTreeMap::new();
        fields.insert(
            "age".to_string(),
            NormalizedField::resolved(FieldValue::Integer(34), Confidence::SameLine, None),
        );
        fields.insert("name".to_string(), {
            let mut f = NormalizedField::resolved(
                FieldValue::Text("John Doe".into()),
                Confidence::SameLine,
                Some(Span::lines(0, 0)),
            );
            f.redact();
            f
        });
        fields.insert(
            "hymen".to_string(),
            NormalizedField::resolved(FieldValue::Text("intact".into()), Confidence::Block, None)
                .in_group(Some("genital_examination")),
        );
        Record {
            document_id: "doc-1".into(),
            family: "statement".into(),
            fields,
            completeness: 1.0,
            content_digest: String::new(),
            page_count: 1,
        }
    }

    #[test]
    fn test_redact_clears_everything() {
        let record = sample_record();
        let name = record.field("name").unwrap();
        assert!(name.value.is_none());
        assert!(name.span.is_none());
        assert_eq!(name.confidence, Confidence::Redacted);
    }

    #[test]
    fn test_output_shape() {
        let out = sample_record().to_output();
        assert_eq!(out["fields"]["age"], 34);
        assert!(out["fields"]["name"].is_null());
        assert_eq!(out["fields"]["genital_examination"]["hymen"], "intact");
        assert_eq!(out["field_status"]["name"], "redacted");
        assert_eq!(out["field_status"]["genital_examination.hymen"], "block");
    }

    #[test]
    fn test_date_serializes_iso() {
        let value = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(serde_json::to_value(&value).unwrap(), "2024-03-05");
    }

    #[test]
    fn test_failure_has_zero_completeness() {
        let failure = ExtractionFailure::new("doc-9", "empty");
        assert_eq!(failure.completeness, 0.0);
        assert!(failure.to_string().contains("doc-9"));
    }
}
