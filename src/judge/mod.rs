//! Judge Engine
//!
//! Per-slide hit testing. A session freezes one image's regions, takes click
//! positions in ratio space and tracks found regions, misses and score.
//!
//! Finding the last region does not end the slide at once: completion is
//! scheduled a short delay later so feedback can play. The pending
//! completion is a [`ScheduledCompletion`] keyed to the session; loading
//! another slide drops it.

pub mod run;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::annotation::{Region, RegionSet};
use crate::config::JudgeSettings;
use crate::geometry::RatioPoint;

pub use run::{Advance, ExamRun};

/// Lifecycle of a slide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlidePhase {
    InProgress,
    AllFound,
    Surrendered,
}

impl SlidePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SlidePhase::AllFound | SlidePhase::Surrendered)
    }
}

/// Result of a single click
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Newly found region
    Hit {
        region_id: String,
        awarded: u32,
        /// Set when this hit found the last region
        completion: Option<ScheduledCompletion>,
    },
    /// Region was already found; nothing changes
    AlreadyFound { region_id: String },
    Miss { miss_count: u32, surrendered: bool },
    /// Slide is finished or finishing; click not evaluated
    Ignored,
}

/// Deferred all-found transition, keyed to the session that scheduled it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledCompletion {
    pub session_id: Uuid,
    pub due_at: Instant,
}

impl ScheduledCompletion {
    pub fn remaining(&self, now: Instant) -> Duration {
        self.due_at.saturating_duration_since(now)
    }
}

/// Runtime state of one slide
#[derive(Debug, Clone)]
pub struct JudgeSession {
    id: Uuid,
    regions: RegionSet,
    found: Vec<String>,
    miss_count: u32,
    score: u32,
    phase: SlidePhase,
    pending: Option<ScheduledCompletion>,
    settings: JudgeSettings,
}

impl JudgeSession {
    /// Load a slide: nothing found, no misses, zero score
    pub fn load(regions: RegionSet, settings: JudgeSettings) -> Self {
        let id = Uuid::new_v4();
        debug!("Judge session {} loaded with {} regions", id, regions.len());
        Self {
            id,
            regions,
            found: Vec::new(),
            miss_count: 0,
            score: 0,
            phase: SlidePhase::InProgress,
            pending: None,
            settings,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    pub fn phase(&self) -> SlidePhase {
        self.phase
    }

    pub fn miss_count(&self) -> u32 {
        self.miss_count
    }

    pub fn max_misses(&self) -> u32 {
        self.settings.max_misses
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Found region ids in the order they were found
    pub fn found(&self) -> &[String] {
        &self.found
    }

    pub fn is_found(&self, region_id: &str) -> bool {
        self.found.iter().any(|id| id == region_id)
    }

    pub fn pending_completion(&self) -> Option<&ScheduledCompletion> {
        self.pending.as_ref()
    }

    /// Whether clicks are still evaluated
    pub fn accepts_clicks(&self) -> bool {
        self.phase == SlidePhase::InProgress && self.pending.is_none()
    }

    /// Evaluate a click now
    pub fn click(&mut self, point: RatioPoint) -> ClickOutcome {
        self.click_at(point, Instant::now())
    }

    /// Evaluate a click at `now`.
    ///
    /// Regions are tested in set order and the first match wins, so
    /// overlapping regions resolve by creation order.
    pub fn click_at(&mut self, point: RatioPoint, now: Instant) -> ClickOutcome {
        if !self.accepts_clicks() {
            return ClickOutcome::Ignored;
        }

        let Some(region) = self.regions.hit_test(point) else {
            return self.register_miss();
        };
        if self.is_found(&region.id) {
            return ClickOutcome::AlreadyFound {
                region_id: region.id.clone(),
            };
        }

        let region_id = region.id.clone();
        let awarded = region.score_weight;
        self.found.push(region_id.clone());
        self.score = self.score.saturating_add(awarded);
        debug!(
            "Hit {} (+{}), {}/{} found",
            region_id,
            awarded,
            self.found.len(),
            self.regions.len()
        );

        let completion = if self.found.len() == self.regions.len() {
            self.schedule_completion(now)
        } else {
            None
        };

        ClickOutcome::Hit {
            region_id,
            awarded,
            completion,
        }
    }

    fn register_miss(&mut self) -> ClickOutcome {
        self.miss_count += 1;
        let surrendered = self.miss_count >= self.settings.max_misses;
        if surrendered {
            self.phase = SlidePhase::Surrendered;
            info!("Slide surrendered after {} misses (score {})", self.miss_count, self.score);
        }
        ClickOutcome::Miss {
            miss_count: self.miss_count,
            surrendered,
        }
    }

    fn schedule_completion(&mut self, now: Instant) -> Option<ScheduledCompletion> {
        let delay = Duration::from_millis(self.settings.completion_delay_ms);
        if delay.is_zero() {
            self.finish_all_found();
            return None;
        }
        let completion = ScheduledCompletion {
            session_id: self.id,
            due_at: now + delay,
        };
        self.pending = Some(completion);
        Some(completion)
    }

    fn finish_all_found(&mut self) {
        self.pending = None;
        self.phase = SlidePhase::AllFound;
        info!("All {} hazards found (score {})", self.regions.len(), self.score);
    }

    /// Fire the pending completion if it is due. Returns the new phase when
    /// the transition happened.
    pub fn poll(&mut self, now: Instant) -> Option<SlidePhase> {
        let due = self.pending.as_ref().is_some_and(|p| now >= p.due_at);
        if !due {
            return None;
        }
        self.finish_all_found();
        Some(self.phase)
    }

    /// Fire a completion delivered by an external timer. Tokens from other
    /// sessions (an earlier slide) are ignored.
    pub fn complete(&mut self, completion: &ScheduledCompletion) -> bool {
        if self.pending.as_ref() != Some(completion) {
            return false;
        }
        self.finish_all_found();
        true
    }

    /// Regions to display with their found flag: found ones while the slide
    /// is running, every region once it is over.
    pub fn revealed(&self) -> Vec<(&Region, bool)> {
        let reveal_all = self.phase.is_terminal();
        self.regions
            .iter()
            .map(|r| (r, self.is_found(&r.id)))
            .filter(|(_, found)| reveal_all || *found)
            .collect()
    }
}
