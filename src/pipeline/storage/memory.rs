use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value;
use uuid::Uuid;

use super::types::ArtifactStore;
use super::StoreError;
use crate::models::{ArtifactKind, SourceDocument};

struct DocumentSlot {
    document: SourceDocument,
    artifacts: Mutex<BTreeMap<ArtifactKind, Value>>,
}

/// Process-local store. The outer map is only write-locked to register a
/// document; artifact writes lock their own document's slot.
#[derive(Default)]
pub struct MemoryArtifactStore {
    documents: RwLock<HashMap<Uuid, Arc<DocumentSlot>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: &Uuid) -> Result<Option<Arc<DocumentSlot>>, StoreError> {
        let documents = self.documents.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(documents.get(id).cloned())
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn insert_document(&self, doc: &SourceDocument) -> Result<(), StoreError> {
        let mut documents = self.documents.write().map_err(|_| StoreError::LockPoisoned)?;
        if documents.contains_key(&doc.id) {
            return Err(StoreError::DuplicateDocument(doc.id));
        }
        documents.insert(
            doc.id,
            Arc::new(DocumentSlot {
                document: doc.clone(),
                artifacts: Mutex::new(BTreeMap::new()),
            }),
        );
        Ok(())
    }

    fn get_document(&self, id: &Uuid) -> Result<Option<SourceDocument>, StoreError> {
        Ok(self.slot(id)?.map(|slot| slot.document.clone()))
    }

    fn list_documents(&self) -> Result<Vec<SourceDocument>, StoreError> {
        let documents = self.documents.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut docs: Vec<SourceDocument> =
            documents.values().map(|slot| slot.document.clone()).collect();
        docs.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));
        Ok(docs)
    }

    fn put_artifact(
        &self,
        document_id: &Uuid,
        kind: ArtifactKind,
        payload: &Value,
    ) -> Result<(), StoreError> {
        let slot = self
            .slot(document_id)?
            .ok_or(StoreError::DocumentNotFound(*document_id))?;
        let mut artifacts = slot.artifacts.lock().map_err(|_| StoreError::LockPoisoned)?;
        artifacts.insert(kind, payload.clone());
        Ok(())
    }

    fn get_artifact(
        &self,
        document_id: &Uuid,
        kind: ArtifactKind,
    ) -> Result<Option<Value>, StoreError> {
        let Some(slot) = self.slot(document_id)? else {
            return Ok(None);
        };
        let artifacts = slot.artifacts.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(artifacts.get(&kind).cloned())
    }

    fn list_artifacts(&self, document_id: &Uuid) -> Result<Vec<ArtifactKind>, StoreError> {
        let Some(slot) = self.slot(document_id)? else {
            return Ok(Vec::new());
        };
        let artifacts = slot.artifacts.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(artifacts.keys().copied().collect())
    }
}
