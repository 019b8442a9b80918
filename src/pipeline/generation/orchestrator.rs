use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::coverage::compute_coverage;
use super::parser::{parse_for_stage, ParseOutcome};
use super::prompt::{build_stage_prompt, system_prompt, PriorContext};
use super::retry::RetryPolicy;
use super::types::{GenerationOptions, LlmClient};
use super::GenerationError;
use crate::models::{
    ArtifactKind, CoverageSummary, RegisterError, SourceDocument, StageName, StageResult,
    TestCaseCollection, TestDataCollection,
};
use crate::pipeline::export::projector::{build_tabular_export, TabularExport};
use crate::pipeline::storage::{load_stage_result, put_typed, save_stage_result, ArtifactStore, StoreError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Document not found: {0}")]
    UnknownDocument(Uuid),

    /// The coverage was refreshed from this run's completed stages plus the
    /// stored results of the stages it never reached.
    #[error("Run cancelled after {} completed stage(s)", completed.len())]
    Cancelled {
        completed: Vec<StageName>,
        coverage: CoverageSummary,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Register(#[from] RegisterError),

    #[error("Worker for document {0} panicked")]
    WorkerPanicked(Uuid),
}

/// Shared cancellation signal, checked before each stage starts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one document run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub document_id: Uuid,
    pub stages: Vec<StageResult>,
    pub coverage: CoverageSummary,
    pub tabular: TabularExport,
}

impl PipelineRun {
    pub fn stage(&self, stage: StageName) -> Option<&StageResult> {
        self.stages.iter().find(|r| r.stage == stage)
    }
}

/// Runs the four generation stages for a document:
/// context → prompt → LLM → parse → persist → forward
pub struct PipelineOrchestrator {
    llm: Box<dyn LlmClient + Send + Sync>,
    store: Arc<dyn ArtifactStore>,
    model_name: String,
    retry: RetryPolicy,
}

impl PipelineOrchestrator {
    pub fn new(
        llm: Box<dyn LlmClient + Send + Sync>,
        store: Arc<dyn ArtifactStore>,
        model_name: &str,
    ) -> Self {
        Self {
            llm,
            store,
            model_name: model_name.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Register a source document; empty content is refused.
    pub fn register_document(
        &self,
        file_name: &str,
        content: &str,
    ) -> Result<SourceDocument, PipelineError> {
        let document = SourceDocument::new(file_name, content)?;
        self.store.insert_document(&document)?;
        tracing::info!(
            document_id = %document.id,
            file_name,
            size_bytes = document.size_bytes,
            "Document registered"
        );
        Ok(document)
    }

    pub fn run(&self, document_id: &Uuid) -> Result<PipelineRun, PipelineError> {
        self.run_with_cancel(document_id, &CancelFlag::default())
    }

    /// Run all stages in order. Stage failures never stop the run; only an
    /// unknown document or cancellation ends it early.
    pub fn run_with_cancel(
        &self,
        document_id: &Uuid,
        cancel: &CancelFlag,
    ) -> Result<PipelineRun, PipelineError> {
        let span = tracing::info_span!("run_pipeline", document_id = %document_id);
        let _guard = span.enter();

        let document = self.require_document(document_id)?;
        let mut results: Vec<StageResult> = Vec::with_capacity(StageName::ALL.len());

        for stage in StageName::ALL {
            if cancel.is_cancelled() {
                let completed: Vec<StageName> = results.iter().map(|r| r.stage).collect();
                tracing::warn!(stage = stage.as_str(), completed = completed.len(), "Run cancelled");
                let merged = self.merge_with_persisted(document_id, results);
                let (coverage, _) = self.finish(document_id, &merged);
                return Err(PipelineError::Cancelled { completed, coverage });
            }

            let prior = nearest_prior(results.iter().rev());
            let result = self.execute_stage(&document, stage, prior.as_ref());
            self.persist_stage(&result);
            results.push(result);
        }

        let (coverage, tabular) = self.finish(document_id, &results);

        tracing::info!(
            user_stories = coverage.user_stories_count,
            test_cases = coverage.test_cases_count,
            test_data = coverage.test_data_count,
            degraded = coverage.degraded_stages.len(),
            "Pipeline complete"
        );

        Ok(PipelineRun {
            document_id: *document_id,
            stages: results,
            coverage,
            tabular,
        })
    }

    /// Re-run one stage from persisted predecessors, overwriting its artifact
    /// and refreshing the coverage and tabular export.
    pub fn run_stage(
        &self,
        document_id: &Uuid,
        stage: StageName,
    ) -> Result<StageResult, PipelineError> {
        let span = tracing::info_span!("run_stage", document_id = %document_id, stage = stage.as_str());
        let _guard = span.enter();

        let document = self.require_document(document_id)?;

        let persisted: Vec<StageResult> = stage
            .predecessors()
            .into_iter()
            .filter_map(|prev| self.load_persisted(document_id, prev))
            .collect();
        let prior = nearest_prior(persisted.iter());

        let result = self.execute_stage(&document, stage, prior.as_ref());
        self.persist_stage(&result);

        let all = self.merge_with_persisted(document_id, vec![result.clone()]);
        self.finish(document_id, &all);

        Ok(result)
    }

    /// Run several documents concurrently. Each run is independent; results
    /// come back in input order.
    pub fn run_many(&self, document_ids: &[Uuid]) -> Vec<Result<PipelineRun, PipelineError>> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = document_ids
                .iter()
                .map(|id| (id, scope.spawn(move || self.run(id))))
                .collect();

            handles
                .into_iter()
                .map(|(id, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(PipelineError::WorkerPanicked(*id)))
                })
                .collect()
        })
    }

    fn require_document(&self, document_id: &Uuid) -> Result<SourceDocument, PipelineError> {
        self.store
            .get_document(document_id)?
            .ok_or(PipelineError::UnknownDocument(*document_id))
    }

    fn execute_stage(
        &self,
        document: &SourceDocument,
        stage: StageName,
        prior: Option<&PriorContext>,
    ) -> StageResult {
        let prompt = build_stage_prompt(stage, document, prior);
        let system = system_prompt(stage);
        let options = GenerationOptions::for_stage(stage);

        tracing::debug!(
            stage = stage.as_str(),
            context_from = prior.map(|p| p.stage.as_str()),
            prompt_chars = prompt.len(),
            "Invoking stage"
        );

        let raw = match self.invoke_with_retry(stage, &prompt, &system, &options) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(stage = stage.as_str(), error = %e, "Stage invocation failed");
                return StageResult::invocation_failed(document.id, stage, e.is_transient(), e.to_string());
            }
        };

        match parse_for_stage(stage, &raw) {
            ParseOutcome::Success(payload) => {
                tracing::info!(
                    stage = stage.as_str(),
                    records = payload.record_count(),
                    "Stage complete"
                );
                StageResult::success(document.id, payload, raw)
            }
            ParseOutcome::Degraded { raw_text, .. } => {
                tracing::warn!(
                    stage = stage.as_str(),
                    response_chars = raw_text.len(),
                    "Stage response unparsable, degraded"
                );
                StageResult::degraded(document.id, stage, raw_text)
            }
        }
    }

    fn invoke_with_retry(
        &self,
        stage: StageName,
        prompt: &str,
        system: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let mut retries = 0;
        loop {
            match self.llm.generate(&self.model_name, prompt, system, options) {
                Ok(raw) => return Ok(raw),
                Err(e) if self.retry.should_retry(&e, retries) => {
                    retries += 1;
                    let delay = self.retry.backoff(retries);
                    tracing::warn!(
                        stage = stage.as_str(),
                        attempt = retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "LLM call failed, retrying"
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn persist_stage(&self, result: &StageResult) {
        if let Err(e) = save_stage_result(self.store.as_ref(), result) {
            tracing::warn!(
                stage = result.stage.as_str(),
                error = %e,
                "Failed to persist stage result, continuing"
            );
        }
    }

    /// Fresh results in stage order, with stored results filling the stages
    /// they do not cover.
    fn merge_with_persisted(&self, document_id: &Uuid, fresh: Vec<StageResult>) -> Vec<StageResult> {
        StageName::ALL
            .into_iter()
            .filter_map(|stage| match fresh.iter().find(|r| r.stage == stage) {
                Some(result) => Some(result.clone()),
                None => self.load_persisted(document_id, stage),
            })
            .collect()
    }

    fn load_persisted(&self, document_id: &Uuid, stage: StageName) -> Option<StageResult> {
        match load_stage_result(self.store.as_ref(), document_id, stage) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(stage = stage.as_str(), error = %e, "Failed to load stored stage result");
                None
            }
        }
    }

    /// Recompute and store the derived artifacts.
    fn finish(&self, document_id: &Uuid, results: &[StageResult]) -> (CoverageSummary, TabularExport) {
        let coverage = compute_coverage(*document_id, results);

        let empty_cases = TestCaseCollection::default();
        let empty_data = TestDataCollection::default();
        let cases = results
            .iter()
            .find_map(|r| r.payload.as_test_cases())
            .unwrap_or(&empty_cases);
        let data = results
            .iter()
            .find_map(|r| r.payload.as_test_data())
            .unwrap_or(&empty_data);
        let tabular = build_tabular_export(*document_id, cases, data);

        let store = self.store.as_ref();
        for (kind, outcome) in [
            (ArtifactKind::Coverage, put_typed(store, document_id, ArtifactKind::Coverage, &coverage)),
            (
                ArtifactKind::TabularExport,
                put_typed(store, document_id, ArtifactKind::TabularExport, &tabular),
            ),
        ] {
            if let Err(e) = outcome {
                tracing::warn!(kind = kind.as_str(), error = %e, "Failed to persist derived artifact");
            }
        }

        (coverage, tabular)
    }
}

/// First result (in iteration order) that has something to forward.
fn nearest_prior<'a, I>(results: I) -> Option<PriorContext>
where
    I: Iterator<Item = &'a StageResult>,
{
    results.into_iter().find_map(|r| {
        r.forward_context().map(|text| PriorContext {
            stage: r.stage,
            text,
        })
    })
}
