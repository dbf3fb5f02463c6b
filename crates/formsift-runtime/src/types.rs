//! Runtime types.

use formsift_core::{ExtractionFailure, Record};
use serde::Serialize;

/// Environment variable overriding the worker count.
pub const WORKERS_ENV: &str = "FORMSIFT_WORKERS";

/// One document waiting for extraction.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    /// Raw OCR output; decoded (and rejected if not UTF-8) by the engine.
    pub content: Vec<u8>,
    /// Family to extract as. `None` detects it from the text.
    pub family: Option<String>,
}

impl Document {
    pub fn new(id: &str, content: Vec<u8>) -> Self {
        Self {
            id: id.to_string(),
            content,
            family: None,
        }
    }

    pub fn from_text(id: &str, text: &str) -> Self {
        Self::new(id, text.as_bytes().to_vec())
    }

    pub fn with_family(mut self, family: &str) -> Self {
        self.family = Some(family.to_string());
        self
    }
}

/// What became of one document.
#[derive(Debug, Clone)]
pub enum DocumentOutcome {
    Extracted(Record),
    Failed(ExtractionFailure),
    /// Never started because the batch was cancelled.
    Cancelled(String),
}

impl DocumentOutcome {
    pub fn document_id(&self) -> &str {
        match self {
            Self::Extracted(r) => &r.document_id,
            Self::Failed(f) => &f.document_id,
            Self::Cancelled(id) => id,
        }
    }
}

/// Worker budget for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkerBudget {
    /// Maximum documents extracted at the same time.
    #[serde(rename = "maxConcurrency")]
    pub max_concurrency: usize,
}

impl WorkerBudget {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// `FORMSIFT_WORKERS` if set and valid, else the machine's parallelism.
    pub fn from_env() -> Self {
        let configured = std::env::var(WORKERS_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|n| *n > 0);
        match configured {
            Some(n) => Self::new(n),
            None => Self::default(),
        }
    }
}

impl Default for WorkerBudget {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(parallelism)
    }
}

/// Results of a batch, in input order within each list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub records: Vec<Record>,
    pub failures: Vec<ExtractionFailure>,
    pub cancelled: Vec<String>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn push(&mut self, outcome: DocumentOutcome) {
        match outcome {
            DocumentOutcome::Extracted(record) => self.records.push(record),
            DocumentOutcome::Failed(failure) => self.failures.push(failure),
            DocumentOutcome::Cancelled(id) => self.cancelled.push(id),
        }
    }

    pub fn total(&self) -> usize {
        self.records.len() + self.failures.len() + self.cancelled.len()
    }

    /// Mean completeness over extracted records.
    pub fn mean_completeness(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.records.iter().map(|r| r.completeness).sum::<f64>() / self.records.len() as f64
    }
}
