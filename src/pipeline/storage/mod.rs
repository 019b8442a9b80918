pub mod types;
pub mod memory;
pub mod sqlite_store;

pub use types::*;
pub use memory::*;
pub use sqlite_store::*;

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Document already registered: {0}")]
    DuplicateDocument(Uuid),
}
