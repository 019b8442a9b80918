use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::ArtifactKind;

/// Insert or replace the artifact stored under `(document_id, kind)`.
pub fn upsert_artifact(
    conn: &Connection,
    document_id: &Uuid,
    kind: ArtifactKind,
    payload: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO artifacts (document_id, kind, payload, updated_at)
         VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%f', 'now'))
         ON CONFLICT(document_id, kind) DO UPDATE SET
            payload = excluded.payload,
            updated_at = excluded.updated_at",
        params![document_id.to_string(), kind.as_str(), payload],
    )?;
    Ok(())
}

pub fn get_artifact(
    conn: &Connection,
    document_id: &Uuid,
    kind: ArtifactKind,
) -> Result<Option<String>, DatabaseError> {
    let result = conn.query_row(
        "SELECT payload FROM artifacts WHERE document_id = ?1 AND kind = ?2",
        params![document_id.to_string(), kind.as_str()],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(payload) => Ok(Some(payload)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Kinds stored for a document.
pub fn list_artifact_kinds(
    conn: &Connection,
    document_id: &Uuid,
) -> Result<Vec<ArtifactKind>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT kind FROM artifacts WHERE document_id = ?1 ORDER BY kind")?;
    let rows = stmt.query_map(params![document_id.to_string()], |row| row.get::<_, String>(0))?;

    let mut kinds = Vec::new();
    for row in rows {
        kinds.push(ArtifactKind::from_str(&row?)?);
    }
    kinds.sort();
    Ok(kinds)
}
