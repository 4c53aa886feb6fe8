//! HazardDrill - hazard-spotting trainer core
//!
//! Administrators draw hazard regions on reference photos, assemble photos
//! into exams, and trainees click on each photo to find the regions before
//! their miss budget runs out.
//!
//! - [`annotation`]: draw/move/resize engine producing a photo's region set
//! - [`scoring`]: exam assembly and advertised score allocation
//! - [`judge`]: click judging per slide and exam runs
//! - [`storage`]: file-backed metadata, exams and score records

pub mod annotation;
pub mod config;
pub mod error;
pub mod geometry;
pub mod judge;
pub mod scoring;
pub mod shared;
pub mod storage;

pub use annotation::{AnnotationEngine, PointerTarget, Region, RegionSet, RegionShape};
pub use config::AppConfig;
pub use error::{AnnotationError, JudgeError, ScoringError};
pub use geometry::{NormalizedRect, PixelBox, PixelPoint, RatioPoint};
pub use judge::{ClickOutcome, ExamRun, JudgeSession, SlidePhase};
pub use scoring::{allocate, AllocationPolicy, Case, ExamPlan};
