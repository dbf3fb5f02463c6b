//! Label specifications — the per-family table that drives extraction.

use serde::{Deserialize, Serialize};

/// How a field's value is located in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRole {
    /// Short value after a label, same line or the lines below it.
    Scalar,
    /// Multi-line value beneath a label.
    Block,
    /// Prose bounded by start/end phrases rather than a label.
    Narrative,
    /// Multi-valued field split into an ordered list.
    List,
}

impl FieldRole {
    /// Roles located through the label dictionary.
    pub fn is_labelled(&self) -> bool {
        !matches!(self, Self::Narrative)
    }
}

impl std::fmt::Display for FieldRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Block => write!(f, "block"),
            Self::Narrative => write!(f, "narrative"),
            Self::List => write!(f, "list"),
        }
    }
}

/// Target type a captured string is normalized into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    Text,
    Integer,
    Decimal,
    Date,
    Time,
    Address,
    Identifier,
    List,
}

/// One canonical field and the surface forms its label may take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSpec {
    /// Canonical field name (e.g. `complainant_name`).
    pub name: String,
    /// Label variants, matched case-insensitively. For narrative fields
    /// these are the start phrases, in priority order.
    pub variants: Vec<String>,
    pub role: FieldRole,
    #[serde(default)]
    pub kind: ValueKind,
    /// Inclusive sanity range for integer fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<(i64, i64)>,
    /// Sub-group the field is nested under in the output (e.g. `genital_examination`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// End phrases for narrative fields, in priority order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub end_phrases: Vec<String>,
    /// Regexes with one capture group, tried when the label pass finds nothing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
}

impl LabelSpec {
    pub fn new(name: &str, variants: &[&str], role: FieldRole) -> Self {
        let kind = match role {
            FieldRole::List => ValueKind::List,
            _ => ValueKind::Text,
        };
        Self {
            name: name.to_string(),
            variants: variants.iter().map(|v| v.to_string()).collect(),
            role,
            kind,
            bounds: None,
            group: None,
            end_phrases: Vec::new(),
            patterns: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_bounds(mut self, min: i64, max: i64) -> Self {
        self.bounds = Some((min, max));
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn with_end_phrases(mut self, phrases: &[&str]) -> Self {
        self.end_phrases = phrases.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_patterns(mut self, patterns: &[&str]) -> Self {
        self.patterns = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    /// The kind normalization should target. List-role fields always split.
    pub fn effective_kind(&self) -> ValueKind {
        match self.role {
            FieldRole::List => ValueKind::List,
            _ => self.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_role_defaults_to_list_kind() {
        let spec = LabelSpec::new("sections", &["Sections"], FieldRole::List);
        assert_eq!(spec.kind, ValueKind::List);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let spec: LabelSpec = serde_json::from_str(
            r#"{"name": "age", "variants": ["Age"], "role": "scalar", "kind": "integer", "bounds": [0, 130]}"#,
        )
        .unwrap();
        assert_eq!(spec.role, FieldRole::Scalar);
        assert_eq!(spec.bounds, Some((0, 130)));
        assert!(spec.group.is_none());
        assert!(spec.patterns.is_empty());
    }

    #[test]
    fn test_list_role_overrides_json_kind() {
        let spec: LabelSpec =
            serde_json::from_str(r#"{"name": "samples", "variants": ["Samples"], "role": "list"}"#)
                .unwrap();
        assert_eq!(spec.kind, ValueKind::Text);
        assert_eq!(spec.effective_kind(), ValueKind::List);
    }
}
