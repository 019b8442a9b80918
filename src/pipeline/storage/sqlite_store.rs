use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde_json::Value;
use uuid::Uuid;

use super::types::ArtifactStore;
use super::StoreError;
use crate::db::{self, DatabaseError};
use crate::models::{ArtifactKind, SourceDocument};

/// SQLite-backed store. Each call opens its own connection, so concurrent
/// runs share nothing but the database file.
pub struct SqliteArtifactStore {
    path: PathBuf,
}

impl SqliteArtifactStore {
    /// Open (creating and migrating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        db::open_database(path)?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        Ok(db::open_connection(&self.path)?)
    }
}

impl ArtifactStore for SqliteArtifactStore {
    fn insert_document(&self, doc: &SourceDocument) -> Result<(), StoreError> {
        let conn = self.connect()?;
        match db::insert_document(&conn, doc) {
            Err(DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(e, _)))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateDocument(doc.id))
            }
            other => Ok(other?),
        }
    }

    fn get_document(&self, id: &Uuid) -> Result<Option<SourceDocument>, StoreError> {
        let conn = self.connect()?;
        Ok(db::get_document(&conn, id)?)
    }

    fn list_documents(&self) -> Result<Vec<SourceDocument>, StoreError> {
        let conn = self.connect()?;
        Ok(db::list_documents(&conn)?)
    }

    fn put_artifact(
        &self,
        document_id: &Uuid,
        kind: ArtifactKind,
        payload: &Value,
    ) -> Result<(), StoreError> {
        let conn = self.connect()?;
        if db::get_document(&conn, document_id)?.is_none() {
            return Err(StoreError::DocumentNotFound(*document_id));
        }
        let text = serde_json::to_string(payload)?;
        db::upsert_artifact(&conn, document_id, kind, &text)?;
        Ok(())
    }

    fn get_artifact(
        &self,
        document_id: &Uuid,
        kind: ArtifactKind,
    ) -> Result<Option<Value>, StoreError> {
        let conn = self.connect()?;
        match db::get_artifact(&conn, document_id, kind)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn list_artifacts(&self, document_id: &Uuid) -> Result<Vec<ArtifactKind>, StoreError> {
        let conn = self.connect()?;
        Ok(db::list_artifact_kinds(&conn, document_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn temp_store() -> (tempfile::TempDir, SqliteArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteArtifactStore::open(&dir.path().join("atf.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn documents_survive_reopen() {
        let (dir, store) = temp_store();
        let doc = SourceDocument::new("a.md", "content").unwrap();
        store.insert_document(&doc).unwrap();
        store.put_artifact(&doc.id, ArtifactKind::Analysis, &json!({"summary": "s"})).unwrap();

        let reopened = SqliteArtifactStore::open(store.path()).unwrap();
        assert_eq!(reopened.get_document(&doc.id).unwrap(), Some(doc.clone()));
        assert_eq!(
            reopened.get_artifact(&doc.id, ArtifactKind::Analysis).unwrap(),
            Some(json!({"summary": "s"}))
        );
        drop(dir);
    }

    #[test]
    fn overwrite_keeps_one_row() {
        let (_dir, store) = temp_store();
        let doc = SourceDocument::new("a.md", "content").unwrap();
        store.insert_document(&doc).unwrap();
        for v in 0..3 {
            store.put_artifact(&doc.id, ArtifactKind::TestData, &json!({"v": v})).unwrap();
        }
        assert_eq!(store.list_artifacts(&doc.id).unwrap(), vec![ArtifactKind::TestData]);
        assert_eq!(
            store.get_artifact(&doc.id, ArtifactKind::TestData).unwrap(),
            Some(json!({"v": 2}))
        );
    }

    #[test]
    fn duplicate_and_unknown_documents() {
        let (_dir, store) = temp_store();
        let doc = SourceDocument::new("a.md", "content").unwrap();
        store.insert_document(&doc).unwrap();
        assert!(matches!(
            store.insert_document(&doc),
            Err(StoreError::DuplicateDocument(_))
        ));
        assert!(matches!(
            store.put_artifact(&Uuid::new_v4(), ArtifactKind::Coverage, &json!({})),
            Err(StoreError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn parallel_writers_on_distinct_documents() {
        let (_dir, store) = temp_store();
        let store = Arc::new(store);
        let ids: Vec<Uuid> = (0..4)
            .map(|i| {
                let doc = SourceDocument::new(format!("{i}.md"), "content").unwrap();
                store.insert_document(&doc).unwrap();
                doc.id
            })
            .collect();

        std::thread::scope(|scope| {
            for id in &ids {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for kind in ArtifactKind::ALL {
                        store.put_artifact(id, kind, &json!({"kind": kind.as_str()})).unwrap();
                    }
                });
            }
        });

        for id in &ids {
            assert_eq!(store.list_artifacts(id).unwrap(), ArtifactKind::ALL.to_vec());
        }
    }
}
