pub mod projector;
pub mod csv_render;
pub mod markdown;
pub mod bundle;

pub use projector::*;
pub use csv_render::*;
pub use markdown::*;
pub use bundle::*;

use thiserror::Error;
use uuid::Uuid;

use crate::pipeline::storage::StoreError;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Document not found: {0}")]
    UnknownDocument(Uuid),

    #[error("Document {0} has no artifacts to export")]
    NothingToExport(Uuid),
}
