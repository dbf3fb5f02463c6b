//! formsift extraction engine — label location, block and narrative
//! capture, normalization, redaction and record assembly.
//!
//! The engine is a single synchronous pass per document. Family tables are
//! compiled once ([`CompiledFamily`]) and shared read-only by every
//! [`Extractor`] built from them.

pub mod assemble;
pub mod block;
pub mod dictionary;
pub mod engine;
pub mod family;
pub mod locator;
pub mod narrative;
pub mod normalize;
pub mod same_line;
pub mod text;

pub use assemble::{Assembly, Candidate, FieldState};
pub use block::{capture_block, BlockCapture};
pub use dictionary::{LabelDictionary, LabelHit};
pub use engine::Extractor;
pub use family::CompiledFamily;
pub use locator::{LabelLocator, Location};
pub use narrative::{Detection, NarrativeCapture, NarrativeDetector, PhraseSet};
pub use normalize::{normalize, Normalized};
pub use same_line::extract_same_line;
pub use text::{content_hash, RawText, PAGE_BREAK};
