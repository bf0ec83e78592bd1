use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Runtime settings for the recognizer and the CLI.
///
/// Attendance rules (windows, cooldown, retention) are NOT here: they live in
/// the `attendance_policy` table so they can change without a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: String,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
    #[serde(default = "default_min_face_px")]
    pub min_face_px: u32,
    #[serde(default = "default_max_faces")]
    pub max_faces: usize,
    #[serde(default)]
    pub save_snapshots: bool,
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,
    #[serde(default = "default_true")]
    pub snapshot_on_unknown: bool,
    #[serde(default = "default_true")]
    pub snapshot_on_low_conf: bool,
    #[serde(default = "default_low_conf_distance")]
    pub low_conf_distance: f32,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_embedding_dim() -> usize {
    512
}
fn default_max_distance() -> f32 {
    0.95
}
fn default_min_face_px() -> u32 {
    80
}
fn default_max_faces() -> usize {
    5
}
fn default_snapshot_dir() -> String {
    Config::config_dir()
        .join("snapshots")
        .to_string_lossy()
        .to_string()
}
fn default_true() -> bool {
    true
}
fn default_low_conf_distance() -> f32 {
    0.8
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self::with_database(Self::database_file())
    }
}

impl Config {
    /// Defaults pointing at a specific database file.
    pub fn with_database(db: impl AsRef<Path>) -> Self {
        Self {
            database: db.as_ref().to_string_lossy().to_string(),
            embedding_dim: default_embedding_dim(),
            max_distance: default_max_distance(),
            min_face_px: default_min_face_px(),
            max_faces: default_max_faces(),
            save_snapshots: false,
            snapshot_dir: default_snapshot_dir(),
            snapshot_on_unknown: true,
            snapshot_on_low_conf: true,
            low_conf_distance: default_low_conf_distance(),
            log_level: default_log_level(),
        }
    }

    /// Return the standard configuration directory depending on the platform
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            let appdata = env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(appdata).join("rfacelog")
        } else {
            let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".rfacelog")
        }
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("rfacelog.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("rfacelog.sqlite")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_file())
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&content)
            .map_err(|e| AppError::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Initialize configuration file and database location.
    /// Returns the database path that was configured.
    pub fn init_all(custom_name: Option<String>, is_test: bool) -> AppResult<PathBuf> {
        let dir = Self::config_dir();

        // DB name: user provided or default
        let db_path = match custom_name {
            Some(name) => {
                let p = Path::new(&name);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    dir.join(p)
                }
            }
            None => dir.join("rfacelog.sqlite"),
        };

        if !is_test {
            fs::create_dir_all(&dir)?;
            let config = Config::with_database(&db_path);
            let yaml = serde_yaml::to_string(&config)?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        Ok(db_path)
    }
}
