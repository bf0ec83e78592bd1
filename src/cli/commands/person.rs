use crate::cli::parser::{Commands, PersonAction};
use crate::config::Config;
use crate::core::enroll;
use crate::core::service::AttendanceService;
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use crate::ui::messages::{info, success, warning};
use crate::utils::table::{Column, Table};
use serde::Deserialize;
use std::fs;

#[derive(Deserialize)]
#[serde(untagged)]
enum VectorFile {
    One(Vec<f32>),
    Many(Vec<Vec<f32>>),
}

fn read_vectors(path: &str) -> AppResult<Vec<Vec<f32>>> {
    let raw = fs::read(path)?;
    let parsed: VectorFile = serde_json::from_slice(&raw)
        .map_err(|e| AppError::InvalidVector(format!("{}: {}", path, e)))?;
    Ok(match parsed {
        VectorFile::One(v) => vec![v],
        VectorFile::Many(vs) => vs,
    })
}

/// Every enrollment mutation ends with a cache rebuild.
fn refresh_cache(cfg: &Config, pool: &DbPool) -> AppResult<()> {
    let service = AttendanceService::with_json_capabilities(cfg.clone());
    let generation = service.on_enrollment_changed(&pool.conn)?;
    info(format!(
        "Identity cache rebuilt: {} identit{} indexed",
        generation.len(),
        if generation.len() == 1 { "y" } else { "ies" }
    ));
    Ok(())
}

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Person { action } = cmd else {
        return Ok(());
    };
    let mut pool = super::open_db(cfg)?;

    match action {
        PersonAction::Add { name } => {
            let created = enroll::create_person(&pool.conn, name)?;
            if created.created {
                success(format!("Person '{}' created (id {})", created.name, created.id));
                refresh_cache(cfg, &pool)?;
            } else {
                warning(format!("Person '{}' already exists (id {})", created.name, created.id));
            }
        }

        PersonAction::Enroll {
            name,
            vectors,
            create,
        } => {
            if *create {
                enroll::create_person(&pool.conn, name)?;
            }
            let vectors = read_vectors(vectors)?;
            let report = enroll::add_embeddings(&mut pool.conn, name, &vectors, cfg.embedding_dim)?;
            success(format!(
                "{} vector(s) added to '{}'",
                report.added, report.person
            ));
            if report.skipped > 0 {
                warning(format!(
                    "{} vector(s) skipped (expected dimension {})",
                    report.skipped, cfg.embedding_dim
                ));
            }
            if report.added > 0 {
                refresh_cache(cfg, &pool)?;
            }
        }

        PersonAction::List { json } => {
            let persons = enroll::list_persons(&pool.conn)?;
            if *json {
                return super::print_json(&persons);
            }
            if persons.is_empty() {
                info("No persons enrolled.");
                return Ok(());
            }
            let mut table = Table::new(vec![
                Column::new("ID", 4),
                Column::new("NAME", 12),
                Column::new("VECTORS", 7),
                Column::new("CREATED", 20),
            ]);
            for p in &persons {
                table.add_row(vec![
                    p.id.to_string(),
                    p.name.clone(),
                    p.embeddings.to_string(),
                    p.created_at.clone(),
                ]);
            }
            print!("{}", table.render());
        }

        PersonAction::Delete { name } => {
            let removed = enroll::delete_person(&mut pool.conn, name)?;
            success(format!(
                "Person '{}' deleted with {} vector(s)",
                name.trim(),
                removed
            ));
            refresh_cache(cfg, &pool)?;
        }

        PersonAction::RemoveEmbedding { id } => {
            enroll::remove_embedding(&pool.conn, *id)?;
            success(format!("Embedding {} removed", id));
            refresh_cache(cfg, &pool)?;
        }
    }

    Ok(())
}
