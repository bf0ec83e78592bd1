//! Feature store: persons and their embedding vectors.

use crate::errors::{AppError, AppResult};
use crate::models::person::{FeatureSnapshot, Identity, Person};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

pub fn find_person_id(conn: &Connection, name: &str) -> AppResult<Option<i64>> {
    let mut stmt = conn.prepare_cached("SELECT id FROM persons WHERE name = ?1")?;
    Ok(stmt.query_row([name], |r| r.get(0)).optional()?)
}

/// Insert a person if missing. Returns (id, created).
pub fn insert_person(conn: &Connection, name: &str) -> AppResult<(i64, bool)> {
    if let Some(id) = find_person_id(conn, name)? {
        return Ok((id, false));
    }
    conn.execute(
        "INSERT INTO persons (name, created_at) VALUES (?1, ?2)",
        params![name, Utc::now().to_rfc3339()],
    )?;
    Ok((conn.last_insert_rowid(), true))
}

pub fn insert_embedding(conn: &Connection, person_id: i64, vector: &[f32]) -> AppResult<i64> {
    let encoded = serde_json::to_string(vector)?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO embeddings (person_id, vector, created_at) VALUES (?1, ?2, ?3)",
    )?;
    stmt.execute(params![person_id, encoded, Utc::now().to_rfc3339()])?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_embedding(conn: &Connection, id: i64) -> AppResult<()> {
    let n = conn.execute("DELETE FROM embeddings WHERE id = ?1", [id])?;
    if n == 0 {
        return Err(AppError::EmbeddingNotFound(id));
    }
    Ok(())
}

/// Delete a person; embeddings go with it (ON DELETE CASCADE). Returns removed vector count.
pub fn delete_person(conn: &Connection, name: &str) -> AppResult<usize> {
    let id = find_person_id(conn, name)?.ok_or_else(|| AppError::PersonNotFound(name.into()))?;
    let vectors: i64 = conn.query_row(
        "SELECT COUNT(*) FROM embeddings WHERE person_id = ?1",
        [id],
        |r| r.get(0),
    )?;
    // explicit delete as well, in case foreign keys are disabled on this connection
    conn.execute("DELETE FROM embeddings WHERE person_id = ?1", [id])?;
    conn.execute("DELETE FROM persons WHERE id = ?1", [id])?;
    Ok(vectors as usize)
}

pub fn list_persons(conn: &Connection) -> AppResult<Vec<Person>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, COUNT(e.id), p.created_at
         FROM persons p LEFT JOIN embeddings e ON e.person_id = p.id
         GROUP BY p.id
         ORDER BY p.name ASC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Person {
            id: r.get(0)?,
            name: r.get(1)?,
            embeddings: r.get::<_, i64>(2)? as usize,
            created_at: r.get(3)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Read the whole feature store. Persons ordered by id, vectors by id.
/// Persons without vectors are included (with an empty list).
pub fn load_feature_snapshot(conn: &Connection) -> AppResult<FeatureSnapshot> {
    let mut stmt = conn.prepare(
        "SELECT p.name, e.vector
         FROM persons p LEFT JOIN embeddings e ON e.person_id = p.id
         ORDER BY p.id ASC, e.id ASC",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, Option<String>>(1)?))
    })?;

    let mut identities: Vec<Identity> = Vec::new();
    for r in rows {
        let (name, raw) = r?;
        if identities.last().map(|i| i.name != name).unwrap_or(true) {
            identities.push(Identity {
                name: name.clone(),
                vectors: Vec::new(),
            });
        }
        if let Some(raw) = raw {
            let vector: Vec<f32> = serde_json::from_str(&raw).map_err(|e| {
                AppError::InvalidVector(format!("stored vector for '{}': {}", name, e))
            })?;
            if let Some(last) = identities.last_mut() {
                last.vectors.push(vector);
            }
        }
    }

    Ok(FeatureSnapshot { identities })
}
