//! Application Configuration
//!
//! Trainer settings stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::scoring::AllocationPolicy;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Region drawing settings
    pub annotation: AnnotationSettings,
    /// Click judging settings
    pub judge: JudgeSettings,
    /// Exam score allocation settings
    pub scoring: ScoringSettings,
    /// Storage settings
    pub storage: StorageSettings,
}

/// Region annotation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationSettings {
    /// Drawn boxes must exceed this size on both axes to be kept
    pub min_draw_size: f64,
    /// Smallest width/height a resize can shrink a region to
    pub min_resize_size: f64,
    /// Weight suggested for a new region before classification
    pub default_score_weight: u32,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            min_draw_size: 0.02,
            min_resize_size: 0.01,
            default_score_weight: 10,
        }
    }
}

/// Judge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeSettings {
    /// Misses allowed before a slide is surrendered
    pub max_misses: u32,
    /// Delay before an all-found slide is reported complete
    pub completion_delay_ms: u64,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            max_misses: 3,
            completion_delay_ms: 800,
        }
    }
}

/// Exam assembly scoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSettings {
    /// Total advertised exam score
    pub total_score: u32,
    /// Allocation policy used for advertised per-case scores
    pub policy: AllocationPolicy,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            total_score: 100,
            policy: AllocationPolicy::Weighted,
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Data directory override; the platform data directory is used when unset
    pub data_dir: Option<PathBuf>,
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert!((config.annotation.min_draw_size - 0.02).abs() < f64::EPSILON);
        assert!((config.annotation.min_resize_size - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.annotation.default_score_weight, 10);

        assert_eq!(config.judge.max_misses, 3);
        assert_eq!(config.judge.completion_delay_ms, 800);

        assert_eq!(config.scoring.total_score, 100);
        assert_eq!(config.scoring.policy, AllocationPolicy::Weighted);

        assert!(config.storage.data_dir.is_none());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.scoring.policy = AllocationPolicy::Average;
        config.judge.completion_delay_ms = 250;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.scoring.policy, AllocationPolicy::Average);
        assert_eq!(parsed.judge.completion_delay_ms, 250);
        assert_eq!(parsed.annotation.default_score_weight, 10);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            [scoring]
            policy = "average"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.scoring.policy, AllocationPolicy::Average);
        assert_eq!(parsed.scoring.total_score, 100);
        assert_eq!(parsed.judge.max_misses, 3);
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AppConfig::default();
        config.storage.data_dir = Some(PathBuf::from("/tmp/hazard-data"));

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.storage.data_dir, config.storage.data_dir);
        assert_eq!(loaded.judge.max_misses, config.judge.max_misses);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}
