//! Redaction — withholds sensitive fields before a record leaves the engine.
//!
//! Policy is declared per family (see `RedactionPolicy`). A withheld field
//! keeps its key in the record with a null value and the `redacted` tag, so
//! downstream consumers can tell "hidden" from "absent".

pub mod filter;

pub use filter::{RedactionFilter, RedactionSummary};
