//! Events sent from a running exam to presentation layers

use crate::geometry::RatioPoint;
use crate::judge::SlidePhase;
use crate::storage::ScoreRecord;

/// Messages emitted while an exam runs
#[derive(Debug, Clone, PartialEq)]
pub enum JudgeEvent {
    /// A new slide was loaded
    SlideLoaded { slide: usize, image_name: String, hazards: usize },
    /// A region was found; `point` is where to play the hit effect
    Hit {
        slide: usize,
        region_id: String,
        point: RatioPoint,
        awarded: u32,
    },
    /// A click found nothing
    Miss { slide: usize, point: RatioPoint, miss_count: u32 },
    /// The slide reached a terminal phase
    SlideFinished { slide: usize, phase: SlidePhase, slide_score: u32 },
    /// The last slide was advanced past and the record submitted
    ExamFinished(ScoreRecord),
}
