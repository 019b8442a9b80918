use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// A requirements document registered for generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub id: Uuid,
    pub file_name: String,
    pub content: String,
    /// SHA-256 of `content`, lowercase hex.
    pub content_hash: String,
    pub size_bytes: u64,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegisterError {
    #[error("Document '{0}' has no text content")]
    EmptyContent(String),
}

impl SourceDocument {
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Result<Self, RegisterError> {
        let file_name = file_name.into();
        let content = content.into();
        if content.trim().is_empty() {
            return Err(RegisterError::EmptyContent(file_name));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            content_hash: content_hash(&content),
            size_bytes: content.len() as u64,
            uploaded_at: chrono::Local::now().naive_local(),
            file_name,
            content,
        })
    }
}

pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
