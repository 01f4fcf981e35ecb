use std::path::PathBuf;

use crate::policy::MIN_REFERENCE_IMAGES;

/// Library configuration, loaded from `FACESET_*` environment
/// variables with defaults.
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Minimum reference images before a person is recognition-ready.
    pub min_reference_images: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("faceset");

        let db_path = std::env::var("FACESET_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("persons.db"));

        Self {
            db_path,
            min_reference_images: env_usize(
                "FACESET_MIN_REFERENCE_IMAGES",
                MIN_REFERENCE_IMAGES,
            ),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
