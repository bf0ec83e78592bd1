//! Unified application error type.
//! All modules (db, core, cli, utils) return AppError to keep the error
//! handling consistent and easy to manage.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Database migration error: {0}")]
    Migration(String),

    // ---------------------------
    // Serialization
    // ---------------------------
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ---------------------------
    // Parsing errors
    // ---------------------------
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid time format: {0}")]
    InvalidTime(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid event type: {0}")]
    InvalidEventType(String),

    #[error("Invalid feature vector: {0}")]
    InvalidVector(String),

    // ---------------------------
    // Enrollment errors
    // ---------------------------
    #[error("Person not found: {0}")]
    PersonNotFound(String),

    #[error("Embedding not found: {0}")]
    EmbeddingNotFound(i64),

    #[error("Invalid person name: {0}")]
    InvalidName(String),

    // ---------------------------
    // Correction errors
    // ---------------------------
    #[error("Event not found: {0}")]
    EventNotFound(i64),

    #[error("Event cannot be corrected: {0}")]
    InvalidCorrection(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

pub type AppResult<T> = Result<T, AppError>;
