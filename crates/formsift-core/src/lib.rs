//! formsift core — label tables, record model, family configuration, errors.

pub mod config;
pub mod error;
pub mod labels;
pub mod record;

pub use config::{EngineLimits, FamilyConfig, FamilyRegistry, RedactionAction, RedactionPolicy};
pub use error::{Error, Result};
pub use labels::{FieldRole, LabelSpec, ValueKind};
pub use record::{Confidence, ExtractionFailure, FieldValue, NormalizedField, Record, Span};
