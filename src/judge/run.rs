//! Exam run
//!
//! Drives a trainee through an exam's slides in order, one [`JudgeSession`]
//! at a time, and submits the final score when the last slide is left.

use crossbeam_channel::Sender;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::{ClickOutcome, JudgeSession, SlidePhase};
use crate::config::JudgeSettings;
use crate::error::JudgeError;
use crate::geometry::RatioPoint;
use crate::scoring::{ExamPlan, ExamSlide};
use crate::shared::JudgeEvent;
use crate::storage::{ScoreRecord, ScoreRecorder};

/// Exam id used when a run is started without one
pub const FALLBACK_EXAM_ID: &str = "Fallback-Training";

/// Result of leaving a finished slide
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Next slide loaded
    NextSlide { index: usize },
    /// That was the last slide; the record has been submitted
    Finished(ScoreRecord),
}

/// Generated name for trainees who did not enter one
pub fn anonymous_user_name() -> String {
    let suffix = uuid::Uuid::new_v4().as_u128() % 1000;
    format!("anonymous-auditor-{}", suffix)
}

/// One trainee's pass through an exam
pub struct ExamRun {
    exam_id: String,
    user_name: String,
    slides: Vec<ExamSlide>,
    index: usize,
    session: JudgeSession,
    total_score: u32,
    finished: bool,
    settings: JudgeSettings,
    recorder: Arc<dyn ScoreRecorder>,
    events: Option<Sender<JudgeEvent>>,
}

impl ExamRun {
    /// Start at the first slide with a zero score
    pub fn start(
        exam_id: impl Into<String>,
        user_name: impl Into<String>,
        slides: Vec<ExamSlide>,
        settings: JudgeSettings,
        recorder: Arc<dyn ScoreRecorder>,
    ) -> Result<Self, JudgeError> {
        let first = slides.first().ok_or(JudgeError::NoSlides)?;
        let session = JudgeSession::load(first.regions.clone(), settings.clone());

        let mut exam_id = exam_id.into();
        if exam_id.trim().is_empty() {
            exam_id = FALLBACK_EXAM_ID.to_string();
        }
        let user_name = user_name.into();
        info!("Exam {} started by {} ({} slides)", exam_id, user_name, slides.len());

        Ok(Self {
            exam_id,
            user_name,
            slides,
            index: 0,
            session,
            total_score: 0,
            finished: false,
            settings,
            recorder,
            events: None,
        })
    }

    /// Start a run over a published plan
    pub fn from_plan(
        plan: &ExamPlan,
        user_name: impl Into<String>,
        settings: JudgeSettings,
        recorder: Arc<dyn ScoreRecorder>,
    ) -> Result<Self, JudgeError> {
        Self::start(plan.exam_name.clone(), user_name, plan.slides.clone(), settings, recorder)
    }

    /// Broadcast judge events to `sender`. Announces the current slide.
    pub fn with_events(mut self, sender: Sender<JudgeEvent>) -> Self {
        self.events = Some(sender);
        self.announce_slide();
        self
    }

    pub fn exam_id(&self) -> &str {
        &self.exam_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn slide_index(&self) -> usize {
        self.index
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn is_last_slide(&self) -> bool {
        self.index + 1 == self.slides.len()
    }

    pub fn current_slide(&self) -> &ExamSlide {
        &self.slides[self.index]
    }

    pub fn session(&self) -> &JudgeSession {
        &self.session
    }

    /// Score accumulated over all slides so far
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Click on the current slide now
    pub fn click(&mut self, point: RatioPoint) -> ClickOutcome {
        self.click_at(point, Instant::now())
    }

    /// Click on the current slide at `now`
    pub fn click_at(&mut self, point: RatioPoint, now: Instant) -> ClickOutcome {
        if self.finished {
            return ClickOutcome::Ignored;
        }
        let outcome = self.session.click_at(point, now);

        match &outcome {
            ClickOutcome::Hit { region_id, awarded, .. } => {
                self.total_score = self.total_score.saturating_add(*awarded);
                self.emit(JudgeEvent::Hit {
                    slide: self.index,
                    region_id: region_id.clone(),
                    point,
                    awarded: *awarded,
                });
                if self.session.phase().is_terminal() {
                    self.announce_finished();
                }
            }
            ClickOutcome::Miss { miss_count, surrendered } => {
                self.emit(JudgeEvent::Miss {
                    slide: self.index,
                    point,
                    miss_count: *miss_count,
                });
                if *surrendered {
                    self.announce_finished();
                }
            }
            ClickOutcome::AlreadyFound { .. } | ClickOutcome::Ignored => {}
        }
        outcome
    }

    /// Fire the current slide's pending completion if due
    pub fn poll(&mut self, now: Instant) -> Option<SlidePhase> {
        let phase = self.session.poll(now)?;
        self.announce_finished();
        Some(phase)
    }

    /// Leave a finished slide: load the next one, or submit the record
    /// after the last one. Fails without changing anything while the slide
    /// is still in progress.
    pub fn advance(&mut self) -> Result<Advance, JudgeError> {
        if self.finished {
            return Err(JudgeError::ExamFinished);
        }
        if !self.session.phase().is_terminal() {
            return Err(JudgeError::SlideNotFinished { index: self.index });
        }

        if !self.is_last_slide() {
            self.index += 1;
            self.session = JudgeSession::load(self.slides[self.index].regions.clone(), self.settings.clone());
            debug!("Advanced to slide {}/{}", self.index + 1, self.slides.len());
            self.announce_slide();
            return Ok(Advance::NextSlide { index: self.index });
        }

        self.finished = true;
        let record = ScoreRecord::now(self.exam_id.clone(), self.user_name.clone(), self.total_score);
        info!("Exam {} finished by {} with {} points", self.exam_id, self.user_name, self.total_score);
        self.recorder.record(record.clone());
        self.emit(JudgeEvent::ExamFinished(record.clone()));
        Ok(Advance::Finished(record))
    }

    fn announce_slide(&self) {
        let slide = self.current_slide();
        self.emit(JudgeEvent::SlideLoaded {
            slide: self.index,
            image_name: slide.image_name.clone(),
            hazards: slide.regions.len(),
        });
    }

    fn announce_finished(&self) {
        self.emit(JudgeEvent::SlideFinished {
            slide: self.index,
            phase: self.session.phase(),
            slide_score: self.session.score(),
        });
    }

    fn emit(&self, event: JudgeEvent) {
        if let Some(sender) = &self.events {
            // a closed receiver only means nobody is watching
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Region, RegionSet, RegionShape};
    use crate::geometry::NormalizedRect;
    use crate::storage::MemoryRecorder;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    fn region(id: &str, x: f64, weight: u32) -> Region {
        Region {
            id: id.to_string(),
            shape: RegionShape::Rectangle,
            rect: NormalizedRect::new(x, 0.1, 0.1, 0.1),
            clause_id: "k-1".to_string(),
            score_weight: weight,
            description: String::new(),
        }
    }

    fn slides() -> Vec<ExamSlide> {
        vec![
            ExamSlide::new("a.jpg", RegionSet::from(vec![region("a1", 0.1, 10), region("a2", 0.5, 15)])),
            ExamSlide::new("b.jpg", RegionSet::from(vec![region("b1", 0.1, 20)])),
        ]
    }

    fn at(x: f64) -> RatioPoint {
        RatioPoint::new(x + 0.05, 0.15)
    }

    const MISS: RatioPoint = RatioPoint { x: 0.9, y: 0.9 };

    #[test]
    fn test_full_run_records_total() {
        let recorder = Arc::new(MemoryRecorder::new());
        let mut run = ExamRun::start("drill", "ana", slides(), JudgeSettings::default(), recorder.clone()).unwrap();
        let t0 = Instant::now();

        run.click_at(at(0.1), t0);
        run.click_at(at(0.5), t0);
        assert_eq!(run.advance(), Err(JudgeError::SlideNotFinished { index: 0 }));

        assert_eq!(run.poll(t0 + Duration::from_millis(800)), Some(SlidePhase::AllFound));
        assert_eq!(run.advance(), Ok(Advance::NextSlide { index: 1 }));
        assert_eq!(run.session().score(), 0);

        // surrender slide two without finding anything
        run.click_at(MISS, t0);
        run.click_at(MISS, t0);
        run.click_at(MISS, t0);
        assert_eq!(run.session().phase(), SlidePhase::Surrendered);

        let Advance::Finished(record) = run.advance().unwrap() else {
            panic!("expected the exam to finish");
        };
        assert_eq!(record.exam_id, "drill");
        assert_eq!(record.user_name, "ana");
        assert_eq!(record.score, 25);
        assert_eq!(recorder.records(), vec![record]);

        assert!(run.is_finished());
        assert_eq!(run.advance(), Err(JudgeError::ExamFinished));
        assert_eq!(run.click(at(0.1)), ClickOutcome::Ignored);
    }

    #[test]
    fn test_run_from_published_plan() {
        let mut plan = ExamPlan::new(" Warehouse drill ", "");
        for slide in slides() {
            plan.toggle_slide(slide);
        }
        assert!(plan.publish());

        let recorder = Arc::new(MemoryRecorder::new());
        let settings = JudgeSettings {
            completion_delay_ms: 0,
            ..JudgeSettings::default()
        };
        let mut run = ExamRun::from_plan(&plan, "ana", settings, recorder.clone()).unwrap();
        assert_eq!(run.exam_id(), "Warehouse drill");
        assert_eq!(run.slide_count(), 2);
        assert_eq!(run.current_slide().image_name, "a.jpg");

        run.click(at(0.1));
        run.click(at(0.5));
        assert_eq!(run.advance(), Ok(Advance::NextSlide { index: 1 }));
        assert_eq!(run.current_slide().image_name, "b.jpg");

        run.click(at(0.1));
        let Advance::Finished(record) = run.advance().unwrap() else {
            panic!("expected the exam to finish");
        };
        assert_eq!(record.exam_id, plan.exam_name);
        assert_eq!(record.score, 45);
        assert_eq!(recorder.records().len(), 1);
    }

    #[test]
    fn test_no_slides() {
        let result = ExamRun::start("drill", "ana", Vec::new(), JudgeSettings::default(), Arc::new(MemoryRecorder::new()));
        assert!(matches!(result, Err(JudgeError::NoSlides)));
    }

    #[test]
    fn test_blank_exam_id_falls_back() {
        let run = ExamRun::start(" ", "ana", slides(), JudgeSettings::default(), Arc::new(MemoryRecorder::new())).unwrap();
        assert_eq!(run.exam_id(), FALLBACK_EXAM_ID);
    }

    #[test]
    fn test_events_stream() {
        let (tx, rx) = unbounded();
        let settings = JudgeSettings {
            completion_delay_ms: 0,
            ..JudgeSettings::default()
        };
        let single = vec![ExamSlide::new("b.jpg", RegionSet::from(vec![region("b1", 0.1, 20)]))];
        let mut run = ExamRun::start("drill", "ana", single, settings, Arc::new(MemoryRecorder::new()))
            .unwrap()
            .with_events(tx);

        run.click(MISS);
        run.click(at(0.1));
        run.advance().unwrap();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], JudgeEvent::SlideLoaded { slide: 0, hazards: 1, .. }));
        assert!(matches!(events[1], JudgeEvent::Miss { miss_count: 1, .. }));
        assert!(matches!(events[2], JudgeEvent::Hit { awarded: 20, .. }));
        assert!(matches!(
            events[3],
            JudgeEvent::SlideFinished { phase: SlidePhase::AllFound, slide_score: 20, .. }
        ));
        assert!(matches!(events[4], JudgeEvent::ExamFinished(ref r) if r.score == 20));
    }

    #[test]
    fn test_anonymous_user_name() {
        assert!(anonymous_user_name().starts_with("anonymous-auditor-"));
    }
}
