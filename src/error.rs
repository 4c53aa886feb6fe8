//! Error types for the annotation, scoring and judge engines

use thiserror::Error;

/// Rejected annotation edits. The region set and any pending draft are left as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    /// Classification attempted without a taxonomy clause selected
    #[error("validation failed: a knowledge clause must be selected")]
    MissingClause,

    /// Score weights must be positive
    #[error("validation failed: score weight must be greater than zero")]
    ZeroWeight,

    /// Classification attempted with no draft awaiting it
    #[error("no drawn region is waiting for classification")]
    NoPendingDraft,

    #[error("region not found: {0}")]
    UnknownRegion(String),
}

impl AnnotationError {
    /// Whether this is a user-correctable validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingClause | Self::ZeroWeight)
    }
}

/// Allocator inputs with nothing to distribute over
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    #[error("degenerate allocation input: {0}")]
    DegenerateInput(&'static str),

    #[error("unknown allocation policy: {0}")]
    UnknownPolicy(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JudgeError {
    /// `advance` called before the slide reached a terminal state
    #[error("slide {index} is still in progress")]
    SlideNotFinished { index: usize },

    #[error("exam has already finished")]
    ExamFinished,

    #[error("exam has no slides")]
    NoSlides,
}
