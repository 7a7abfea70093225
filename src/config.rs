//! Store configuration.
//!
//! Values come from environment variables (a `.env` file is honoured) with
//! defaults for anything unset or unparsable.

use std::env;
use std::str::FromStr;

use log::warn;

use crate::media::DEFAULT_MEDIA_LIMIT_MB;

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Storage name; the LMDB environment lives at `<db_name>.lmdb`
    pub db_name: String,
    /// LMDB map size in megabytes, the store's capacity ceiling
    pub map_size_mb: usize,
    /// Largest video file accepted for embedding
    pub max_media_mb: f64,
    /// Password for the admin editing gate
    pub admin_password: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_name: "learning_library".to_string(),
            map_size_mb: 64,
            max_media_mb: DEFAULT_MEDIA_LIMIT_MB,
            admin_password: "admin123".to_string(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            db_name: lookup("LESSON_LIBRARY_DB_NAME").unwrap_or(defaults.db_name),
            map_size_mb: parse_or("LESSON_LIBRARY_MAP_SIZE_MB", &lookup, defaults.map_size_mb),
            max_media_mb: parse_or("LESSON_LIBRARY_MAX_MEDIA_MB", &lookup, defaults.max_media_mb),
            admin_password: lookup("LESSON_LIBRARY_ADMIN_PASSWORD")
                .unwrap_or(defaults.admin_password),
        }
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid value '{raw}' for {key}");
            default
        }),
        None => default,
    }
}
