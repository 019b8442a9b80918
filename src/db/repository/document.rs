use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::SourceDocument;

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn insert_document(conn: &Connection, doc: &SourceDocument) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents (id, file_name, content, content_hash, size_bytes, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            doc.id.to_string(),
            doc.file_name,
            doc.content,
            doc.content_hash,
            doc.size_bytes as i64,
            doc.uploaded_at.format(DATETIME_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_document(conn: &Connection, id: &Uuid) -> Result<Option<SourceDocument>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, file_name, content, content_hash, size_bytes, uploaded_at
         FROM documents WHERE id = ?1",
    )?;

    let result = stmt.query_row(params![id.to_string()], read_row);

    match result {
        Ok(row) => Ok(Some(document_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_document_by_hash(
    conn: &Connection,
    hash: &str,
) -> Result<Option<SourceDocument>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, file_name, content, content_hash, size_bytes, uploaded_at
         FROM documents WHERE content_hash = ?1 ORDER BY uploaded_at LIMIT 1",
    )?;

    let result = stmt.query_row(params![hash], read_row);

    match result {
        Ok(row) => Ok(Some(document_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All documents, oldest first.
pub fn list_documents(conn: &Connection) -> Result<Vec<SourceDocument>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, file_name, content, content_hash, size_bytes, uploaded_at
         FROM documents ORDER BY uploaded_at, id",
    )?;

    let rows = stmt.query_map([], read_row)?;

    let mut docs = Vec::new();
    for row in rows {
        docs.push(document_from_row(row?)?);
    }
    Ok(docs)
}

struct DocumentRow {
    id: String,
    file_name: String,
    content: String,
    content_hash: String,
    size_bytes: i64,
    uploaded_at: String,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get::<_, String>(0)?,
        file_name: row.get::<_, String>(1)?,
        content: row.get::<_, String>(2)?,
        content_hash: row.get::<_, String>(3)?,
        size_bytes: row.get::<_, i64>(4)?,
        uploaded_at: row.get::<_, String>(5)?,
    })
}

fn document_from_row(row: DocumentRow) -> Result<SourceDocument, DatabaseError> {
    Ok(SourceDocument {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::CorruptRow(e.to_string()))?,
        file_name: row.file_name,
        content: row.content,
        content_hash: row.content_hash,
        size_bytes: row.size_bytes.max(0) as u64,
        uploaded_at: NaiveDateTime::parse_from_str(&row.uploaded_at, DATETIME_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(&row.uploaded_at, "%Y-%m-%d %H:%M:%S"))
            .unwrap_or_default(),
    })
}
