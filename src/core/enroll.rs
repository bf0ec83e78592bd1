use crate::db::features;
use crate::db::log::ttlog;
use crate::errors::{AppError, AppResult};
use crate::models::person::Person;
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;
use tracing::warn;

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct PersonCreated {
    pub id: i64,
    pub name: String,
    pub created: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EmbeddingsAdded {
    pub person: String,
    pub added: usize,
    pub skipped: usize,
}

pub fn validate_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidName("name is empty".into()));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(AppError::InvalidName(format!(
            "name longer than {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

pub fn create_person(conn: &Connection, name: &str) -> AppResult<PersonCreated> {
    let name = validate_name(name)?;
    let (id, created) = features::insert_person(conn, &name)?;
    if created {
        ttlog(conn, "enroll", &name, "person created")?;
    }
    Ok(PersonCreated { id, name, created })
}

fn usable(vector: &[f32], dim: usize) -> bool {
    vector.len() == dim && vector.iter().all(|x| x.is_finite())
}

/// Store the vectors of `name` that have the configured dimension.
/// The person must already exist.
pub fn add_embeddings(
    conn: &mut Connection,
    name: &str,
    vectors: &[Vec<f32>],
    dim: usize,
) -> AppResult<EmbeddingsAdded> {
    let name = validate_name(name)?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let person_id =
        features::find_person_id(&tx, &name)?.ok_or_else(|| AppError::PersonNotFound(name.clone()))?;

    let mut report = EmbeddingsAdded {
        person: name.clone(),
        ..Default::default()
    };
    for v in vectors {
        if usable(v, dim) {
            features::insert_embedding(&tx, person_id, v)?;
            report.added += 1;
        } else {
            warn!(person = %name, len = v.len(), dim, "skipping unusable vector");
            report.skipped += 1;
        }
    }

    if report.added > 0 {
        ttlog(
            &tx,
            "enroll",
            &name,
            &format!("{} vector(s) added, {} skipped", report.added, report.skipped),
        )?;
    }
    tx.commit()?;
    Ok(report)
}

pub fn remove_embedding(conn: &Connection, id: i64) -> AppResult<()> {
    features::delete_embedding(conn, id)?;
    ttlog(conn, "del", &format!("embedding:{}", id), "embedding removed")?;
    Ok(())
}

/// Delete a person and all their vectors. Returns the number of vectors removed.
pub fn delete_person(conn: &mut Connection, name: &str) -> AppResult<usize> {
    let name = validate_name(name)?;
    let tx = conn.transaction()?;
    let removed = features::delete_person(&tx, &name)?;
    ttlog(
        &tx,
        "del",
        &name,
        &format!("person deleted with {} vector(s)", removed),
    )?;
    tx.commit()?;
    Ok(removed)
}

pub fn list_persons(conn: &Connection) -> AppResult<Vec<Person>> {
    features::list_persons(conn)
}
