//! Policy evaluation and in-place field redaction.

use std::collections::HashSet;

use formsift_core::{NormalizedField, RedactionAction, RedactionPolicy};
use serde::Serialize;
use tracing::debug;

/// Counts from one pass over a record, for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RedactionSummary {
    /// Fields whose values were nulled.
    pub redacted: Vec<String>,
    /// Fields left as extracted.
    pub disclosed: usize,
}

/// Compiled redaction policy. Names may refer to a field or to a whole sub-group.
#[derive(Debug, Clone)]
pub struct RedactionFilter {
    default_action: RedactionAction,
    withhold: HashSet<String>,
    disclose: HashSet<String>,
}

impl RedactionFilter {
    pub fn new(policy: &RedactionPolicy) -> Self {
        Self {
            default_action: policy.default_action,
            withhold: policy.withhold.iter().map(|s| s.trim().to_string()).collect(),
            disclose: policy.disclose.iter().map(|s| s.trim().to_string()).collect(),
        }
    }

    /// A filter that never withholds anything.
    pub fn disclose_all() -> Self {
        Self::new(&RedactionPolicy::default())
    }

    /// Withhold entries win over disclose entries; either wins over the default.
    pub fn is_sensitive(&self, field: &str, group: Option<&str>) -> bool {
        let named = |set: &HashSet<String>| {
            set.contains(field) || group.map_or(false, |g| set.contains(g))
        };
        if named(&self.withhold) {
            return true;
        }
        if named(&self.disclose) {
            return false;
        }
        self.default_action == RedactionAction::Withhold
    }

    /// Redact one field in place. Returns whether it was withheld.
    ///
    /// Applies whether or not a value was found, so the tag never leaks
    /// which sensitive fields were present in the source.
    pub fn apply_field(&self, name: &str, field: &mut NormalizedField) -> bool {
        if !self.is_sensitive(name, field.group.as_deref()) {
            return false;
        }
        debug!("Redacted {} ({})", name, field.confidence);
        field.redact();
        true
    }
}

impl Default for RedactionFilter {
    fn default() -> Self {
        Self::disclose_all()
    }
}
