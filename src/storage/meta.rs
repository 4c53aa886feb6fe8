//! Image metadata and exam files
//!
//! Region sets are stored one JSON file per image as `{sceneId, items}`;
//! item order is the region display order and is preserved as written.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::annotation::RegionSet;
use crate::scoring::ExamPlan;

/// Annotation metadata for one image
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMeta {
    /// Knowledge scene the image was annotated under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene_id: Option<String>,
    #[serde(default)]
    pub items: RegionSet,
}

impl ImageMeta {
    pub fn is_annotated(&self) -> bool {
        !self.items.is_empty()
    }
}

/// Path of the metadata file for an image
pub fn meta_path(data_dir: &Path, image_name: &str) -> PathBuf {
    data_dir.join("meta").join(format!("{}.json", image_name))
}

/// Load image metadata from file
pub fn load_meta(path: &Path) -> Result<ImageMeta> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read metadata: {:?}", path))?;
    let meta: ImageMeta =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse metadata: {:?}", path))?;
    Ok(meta)
}

/// Load image metadata, treating a missing file as an unannotated image
pub fn load_meta_or_default(path: &Path) -> Result<ImageMeta> {
    if !path.exists() {
        return Ok(ImageMeta::default());
    }
    load_meta(path)
}

/// Save image metadata to file
pub fn save_meta(meta: &ImageMeta, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(meta)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load an exam plan from file
pub fn load_exam(path: &Path) -> Result<ExamPlan> {
    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read exam: {:?}", path))?;
    let plan: ExamPlan = serde_json::from_str(&content).with_context(|| format!("Failed to parse exam: {:?}", path))?;
    Ok(plan)
}

/// Save an exam plan to file
pub fn save_exam(plan: &ExamPlan, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(plan)?;
    std::fs::write(path, content)?;
    Ok(())
}
