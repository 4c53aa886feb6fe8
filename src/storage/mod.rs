//! Storage Layer
//!
//! File-backed stand-ins for the external store: image metadata, exam plans
//! and score records.

pub mod meta;
pub mod records;

use anyhow::Result;
use std::path::PathBuf;

use crate::config::StorageSettings;

pub use meta::{load_exam, load_meta, load_meta_or_default, meta_path, save_exam, save_meta, ImageMeta};
pub use records::{
    leaderboard, load_records, JsonLinesRecorder, MemoryRecorder, NullRecorder, ScoreRecord, ScoreRecorder,
    LEADERBOARD_LIMIT,
};

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "hazarddrill", "HazardDrill")
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
}

/// Get the application data directory
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = project_dirs()?.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = project_dirs()?.config_dir().to_path_buf();
    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir)
}

/// Data directory honoring the configured override
pub fn resolve_data_dir(settings: &StorageSettings) -> Result<PathBuf> {
    match &settings.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Ok(dir.clone())
        }
        None => get_data_dir(),
    }
}

/// Path of the score records file inside a data directory
pub fn records_path(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("sessions").join("records.jsonl")
}
