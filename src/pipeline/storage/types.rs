use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::StoreError;
use crate::models::{ArtifactKind, CoverageSummary, SourceDocument, StageName, StageResult};

/// Long-term owner of documents and their artifacts.
///
/// One artifact per `(document, kind)`; writing an existing key replaces it.
/// Writes to different documents must not contend on a shared lock.
pub trait ArtifactStore: Send + Sync {
    fn insert_document(&self, doc: &SourceDocument) -> Result<(), StoreError>;

    fn get_document(&self, id: &Uuid) -> Result<Option<SourceDocument>, StoreError>;

    fn list_documents(&self) -> Result<Vec<SourceDocument>, StoreError>;

    fn put_artifact(
        &self,
        document_id: &Uuid,
        kind: ArtifactKind,
        payload: &Value,
    ) -> Result<(), StoreError>;

    fn get_artifact(
        &self,
        document_id: &Uuid,
        kind: ArtifactKind,
    ) -> Result<Option<Value>, StoreError>;

    /// Kinds stored for the document, in pipeline order.
    fn list_artifacts(&self, document_id: &Uuid) -> Result<Vec<ArtifactKind>, StoreError>;
}

pub fn put_typed<T: Serialize + ?Sized>(
    store: &dyn ArtifactStore,
    document_id: &Uuid,
    kind: ArtifactKind,
    value: &T,
) -> Result<(), StoreError> {
    let payload = serde_json::to_value(value)?;
    store.put_artifact(document_id, kind, &payload)
}

pub fn get_typed<T: DeserializeOwned>(
    store: &dyn ArtifactStore,
    document_id: &Uuid,
    kind: ArtifactKind,
) -> Result<Option<T>, StoreError> {
    match store.get_artifact(document_id, kind)? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub fn save_stage_result(store: &dyn ArtifactStore, result: &StageResult) -> Result<(), StoreError> {
    put_typed(store, &result.document_id, result.stage.artifact_kind(), result)
}

pub fn load_stage_result(
    store: &dyn ArtifactStore,
    document_id: &Uuid,
    stage: StageName,
) -> Result<Option<StageResult>, StoreError> {
    get_typed(store, document_id, stage.artifact_kind())
}

pub fn load_coverage(
    store: &dyn ArtifactStore,
    document_id: &Uuid,
) -> Result<Option<CoverageSummary>, StoreError> {
    get_typed(store, document_id, ArtifactKind::Coverage)
}
