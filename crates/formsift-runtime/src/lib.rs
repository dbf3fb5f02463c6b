//! Batch runtime — routes documents to their family's extractor and runs
//! them on a bounded worker pool.
//!
//! The engine itself is synchronous and I/O-free; this crate only decides
//! where and how many documents run at once.

pub mod runner;
pub mod source;
pub mod types;

pub use runner::{BatchRunner, CancelHandle};
pub use source::{load_document, stdin_document};
pub use types::*;
