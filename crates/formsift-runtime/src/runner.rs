//! Batch runner — one blocking task per document, bounded by a semaphore.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use formsift_core::{Error, ExtractionFailure, FamilyRegistry, Result};
use formsift_extract::{Extractor, RawText};
use tokio::sync::Semaphore;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::types::*;

/// Flag shared with a running batch. Documents already started finish;
/// documents not yet started are reported as cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Routes documents to compiled extractors and runs batches.
///
/// Cloning is cheap: compiled tables are shared behind `Arc`.
#[derive(Clone)]
pub struct BatchRunner {
    registry: Arc<FamilyRegistry>,
    extractors: Arc<HashMap<String, Extractor>>,
    budget: WorkerBudget,
    cancel: CancelHandle,
}

impl BatchRunner {
    /// Compile every family in the registry. A bad table fails here,
    /// before any document is touched.
    pub fn new(registry: FamilyRegistry) -> Result<Self> {
        let mut extractors = HashMap::new();
        for config in registry.iter() {
            extractors.insert(config.family.clone(), Extractor::new(config.clone())?);
        }
        let budget = WorkerBudget::from_env();
        info!(
            "Batch runner ready: {} families, {} workers",
            extractors.len(),
            budget.max_concurrency
        );
        Ok(Self {
            registry: Arc::new(registry),
            extractors: Arc::new(extractors),
            budget,
            cancel: CancelHandle::default(),
        })
    }

    pub fn with_budget(mut self, budget: WorkerBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn budget(&self) -> WorkerBudget {
        self.budget
    }

    pub fn registry(&self) -> &FamilyRegistry {
        &self.registry
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn extractor(&self, family: &str) -> Result<&Extractor> {
        self.extractors
            .get(family)
            .ok_or_else(|| Error::UnknownFamily(family.to_string()))
    }

    /// Extract one document on the current thread.
    pub fn process(&self, document: &Document) -> DocumentOutcome {
        let id = document.id.as_str();
        let text = match RawText::from_bytes(id, &document.content) {
            Ok(text) => text,
            Err(e) => return DocumentOutcome::Failed(ExtractionFailure::new(id, e.to_string())),
        };

        let family = match &document.family {
            Some(family) => family.clone(),
            None => match self.registry.detect(text.text()) {
                Some(config) => {
                    debug!("Detected {} as {}", id, config.family);
                    config.family.clone()
                }
                None => {
                    return DocumentOutcome::Failed(ExtractionFailure::new(
                        id,
                        "could not determine the document family",
                    ))
                }
            },
        };

        match self.extractor(&family) {
            Ok(extractor) => DocumentOutcome::Extracted(extractor.extract_prepared(id, &text)),
            Err(e) => DocumentOutcome::Failed(ExtractionFailure::new(id, e.to_string())),
        }
    }

    /// Run a batch on the current thread, in order.
    pub fn run_sequential(&self, documents: &[Document]) -> BatchReport {
        let started = Instant::now();
        let mut report = BatchReport::default();
        for document in documents {
            if self.cancel.is_cancelled() {
                report.push(DocumentOutcome::Cancelled(document.id.clone()));
                continue;
            }
            let outcome = self.process(document);
            debug!("Finished {}", outcome.document_id());
            report.push(outcome);
        }
        report.duration_ms = started.elapsed().as_millis() as u64;
        log_summary(&report);
        report
    }

    /// Run a batch on tokio's blocking pool, at most `max_concurrency`
    /// documents at once. Outcomes keep input order.
    pub async fn run(&self, documents: Vec<Document>) -> BatchReport {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.budget.max_concurrency));
        let mut handles = Vec::with_capacity(documents.len());
        for document in documents {
            let runner = self.clone();
            let semaphore = semaphore.clone();
            let id = document.id.clone();
            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return DocumentOutcome::Cancelled(document.id);
                };
                if runner.cancel.is_cancelled() {
                    return DocumentOutcome::Cancelled(document.id);
                }
                let id = document.id.clone();
                let joined = tokio::task::spawn_blocking(move || runner.process(&document)).await;
                joined_outcome(&id, joined)
            });
            handles.push((id, handle));
        }

        let mut report = BatchReport::default();
        for (id, handle) in handles {
            let outcome = joined_outcome(&id, handle.await);
            debug!("Finished {}", outcome.document_id());
            report.push(outcome);
        }
        report.duration_ms = started.elapsed().as_millis() as u64;
        log_summary(&report);
        report
    }
}

/// A task that died still yields a failure for its document.
fn joined_outcome(
    id: &str,
    joined: std::result::Result<DocumentOutcome, JoinError>,
) -> DocumentOutcome {
    match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Extraction task for {} failed: {}", id, e);
            DocumentOutcome::Failed(ExtractionFailure::new(id, format!("worker failed: {}", e)))
        }
    }
}

fn log_summary(report: &BatchReport) {
    info!(
        "Batch done: {}/{} extracted, {} failed, {} cancelled in {}ms, mean completeness {:.2}",
        report.records.len(),
        report.total(),
        report.failures.len(),
        report.cancelled.len(),
        report.duration_ms,
        report.mean_completeness()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use formsift_core::{Confidence, FamilyConfig, FieldRole, LabelSpec};

    const FIR: &str = "FIRST INFORMATION REPORT\nFIR No.: 17/2024\nPolice Station: Kotwali\n";
    const STATEMENT: &str = "STATEMENT OF WITNESS\nI do hereby state that I saw the theft.\nSignature\n";

    fn runner() -> BatchRunner {
        BatchRunner::new(FamilyRegistry::builtin().unwrap())
            .unwrap()
            .with_budget(WorkerBudget::new(2))
    }

    #[test]
    fn test_detects_family_per_document() {
        let runner = runner();
        let DocumentOutcome::Extracted(record) = runner.process(&Document::from_text("f1", FIR)) else {
            panic!("expected a record");
        };
        assert_eq!(record.family, "fir");
        assert_eq!(record.confidence("police_station"), Some(Confidence::SameLine));
    }

    #[test]
    fn test_explicit_family_wins() {
        let runner = runner();
        let doc = Document::from_text("s1", FIR).with_family("statement");
        let DocumentOutcome::Extracted(record) = runner.process(&doc) else {
            panic!("expected a record");
        };
        assert_eq!(record.family, "statement");
    }

    #[test]
    fn test_undetectable_and_unknown_family_fail() {
        let runner = runner();
        assert!(matches!(
            runner.process(&Document::from_text("x", "grocery list: eggs")),
            DocumentOutcome::Failed(_)
        ));
        let doc = Document::from_text("y", FIR).with_family("passport");
        let DocumentOutcome::Failed(failure) = runner.process(&doc) else {
            panic!("expected a failure");
        };
        assert!(failure.reason.contains("passport"));
        assert!(matches!(runner.extractor("passport"), Err(Error::UnknownFamily(_))));
    }

    #[test]
    fn test_bad_table_fails_before_extraction() {
        let mut registry = FamilyRegistry::builtin().unwrap();
        let mut broken = FamilyConfig::new(
            "broken",
            vec![LabelSpec::new("age", &["Age"], FieldRole::Scalar)],
        );
        broken.labels[0].patterns = vec!["(unclosed".into()];
        registry.insert(broken).unwrap();
        assert!(matches!(BatchRunner::new(registry), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order() {
        let documents = vec![
            Document::from_text("a", FIR),
            Document::new("b", vec![0xff, 0xfe]),
            Document::from_text("c", STATEMENT),
            Document::from_text("d", ""),
        ];

        let report = runner().run(documents).await;

        let ids: Vec<&str> = report.records.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        let failed: Vec<&str> = report.failures.iter().map(|f| f.document_id.as_str()).collect();
        assert_eq!(failed, vec!["b", "d"]);
        assert!(report.failures.iter().all(|f| f.completeness == 0.0));
        assert_eq!(report.records[1].family, "statement");
    }

    #[tokio::test]
    async fn test_cancelled_batch_starts_nothing() {
        let runner = runner();
        runner.cancel_handle().cancel();
        let documents = (0..5).map(|i| Document::from_text(&format!("d{}", i), FIR)).collect();

        let report = runner.run(documents).await;

        assert!(report.records.is_empty());
        assert_eq!(report.cancelled.len(), 5);
        assert_eq!(runner.run_sequential(&[Document::from_text("e", FIR)]).cancelled, vec!["e"]);
    }

    #[tokio::test]
    async fn test_batch_matches_sequential() {
        let runner = runner();
        let documents: Vec<Document> = (0..8)
            .map(|i| Document::from_text(&format!("doc-{}", i), if i % 2 == 0 { FIR } else { STATEMENT }))
            .collect();

        let sequential = runner.run_sequential(&documents);
        let parallel = runner.run(documents).await;

        assert_eq!(parallel.records.len(), 8);
        for (a, b) in sequential.records.iter().zip(&parallel.records) {
            assert_eq!(a.document_id, b.document_id);
            assert_eq!(a.to_output(), b.to_output());
        }
    }

    #[tokio::test]
    async fn test_dead_worker_still_reports_its_document() {
        let joined: std::result::Result<DocumentOutcome, JoinError> =
            tokio::spawn(async { panic!("worker crashed") }).await;
        let outcome = joined_outcome("lost", joined);

        assert_eq!(outcome.document_id(), "lost");
        let mut report = BatchReport::default();
        report.push(outcome);
        assert_eq!(report.total(), 1);
        assert!(report.failures[0].reason.starts_with("worker failed"));
    }
}
