//! Exam assembly
//!
//! An exam is an ordered list of annotated images. The plan computes the
//! advertised per-slide scores shown while assembling; live scoring in the
//! judge uses raw region weights instead.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{allocate, AllocationPolicy, Case};
use crate::annotation::RegionSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    #[default]
    Draft,
    Published,
}

/// One image in an exam together with its frozen regions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSlide {
    pub image_name: String,
    pub regions: RegionSet,
}

impl ExamSlide {
    pub fn new(image_name: impl Into<String>, regions: RegionSet) -> Self {
        Self {
            image_name: image_name.into(),
            regions,
        }
    }

    pub fn case(&self) -> Case {
        Case::from_regions(&self.regions)
    }
}

/// An exam being assembled
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamPlan {
    pub exam_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: ExamStatus,
    pub slides: Vec<ExamSlide>,
}

impl ExamPlan {
    pub fn new(exam_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            exam_name: exam_name.into(),
            description: description.into(),
            status: ExamStatus::Draft,
            slides: Vec::new(),
        }
    }

    /// Add or remove an image from the exam.
    ///
    /// Returns true when the slide is now part of the exam. Images without
    /// any regions cannot be added.
    pub fn toggle_slide(&mut self, slide: ExamSlide) -> bool {
        if let Some(pos) = self.slides.iter().position(|s| s.image_name == slide.image_name) {
            self.slides.remove(pos);
            debug!("Removed {} from exam {}", slide.image_name, self.exam_name);
            return false;
        }
        if slide.regions.is_empty() {
            debug!("Skipping unannotated image {}", slide.image_name);
            return false;
        }
        self.slides.push(slide);
        true
    }

    pub fn contains(&self, image_name: &str) -> bool {
        self.slides.iter().any(|s| s.image_name == image_name)
    }

    pub fn cases(&self) -> Vec<Case> {
        self.slides.iter().map(ExamSlide::case).collect()
    }

    /// Total number of hazards across all slides
    pub fn hazard_count(&self) -> usize {
        self.slides.iter().map(|s| s.regions.len()).sum()
    }

    /// Per-slide advertised scores, in slide order
    pub fn advertised_scores(&self, total: u32, policy: AllocationPolicy) -> Vec<u32> {
        allocate(&self.cases(), total, policy)
    }

    /// Whether the plan can be published: it needs a name and at least one slide
    pub fn is_publishable(&self) -> bool {
        !self.exam_name.trim().is_empty() && !self.slides.is_empty()
    }

    /// Mark the plan published. Returns false when it is not publishable.
    pub fn publish(&mut self) -> bool {
        if !self.is_publishable() {
            return false;
        }
        self.exam_name = self.exam_name.trim().to_string();
        self.description = self.description.trim().to_string();
        self.status = ExamStatus::Published;
        info!("Exam {} published with {} slides", self.exam_name, self.slides.len());
        true
    }
}
