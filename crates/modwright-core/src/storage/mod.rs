mod config;
mod store;

pub use config::EngineConfig;
pub use store::{MemoryStore, SnapshotStore, SqliteStore};

use std::path::PathBuf;

use crate::error::CoreError;

/// Returns `~/.config/modwright[-dev]/` based on MODWRIGHT_ENV.
///
/// Set MODWRIGHT_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MODWRIGHT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("modwright-dev")
    } else {
        base_dir.join("modwright")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
