//! Region Annotation Engine
//!
//! Draw, move and resize state machine for the hazard regions of one image.
//! The engine owns the image's `RegionSet`; the caller hands it in with
//! [`AnnotationEngine::load`] and takes it back for persistence.
//!
//! Gestures are exclusive: at most one draw, move or resize is active, and a
//! drawn box waits in `PendingClassification` until a taxonomy clause is picked.

pub mod region;

use tracing::{debug, info};

use crate::config::AnnotationSettings;
use crate::error::AnnotationError;
use crate::geometry::{
    apply_aspect_lock, clamp_region_origin, fit_square_within, to_ratio, NormalizedRect, PixelBox, PixelPoint,
    RatioPoint,
};

pub use region::{Region, RegionDraft, RegionSet, RegionShape};

/// What a pointer-down landed on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    /// Bare image, starts a draw
    Image,
    /// Body of an existing region, starts a move
    RegionBody(String),
    /// Resize handle (bottom-right corner) of an existing region
    ResizeHandle(String),
}

/// Current gesture
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Drawing {
        /// Fixed corner where the drag started
        anchor: RatioPoint,
        /// Candidate rect, may be zero-area while dragging
        current: NormalizedRect,
    },
    PendingClassification(RegionDraft),
    Moving {
        region_id: String,
        last: RatioPoint,
    },
    Resizing {
        region_id: String,
        last: RatioPoint,
    },
}

/// Annotation session for a single image
#[derive(Debug, Clone)]
pub struct AnnotationEngine {
    regions: RegionSet,
    image_box: PixelBox,
    draw_shape: RegionShape,
    gesture: GestureState,
    settings: AnnotationSettings,
}

impl AnnotationEngine {
    /// Create an engine with an empty region set
    pub fn new(settings: AnnotationSettings) -> Self {
        Self {
            regions: RegionSet::new(),
            image_box: PixelBox::default(),
            draw_shape: RegionShape::Rectangle,
            gesture: GestureState::Idle,
            settings,
        }
    }

    /// Replace the region set, e.g. when switching images.
    /// Any in-flight gesture or pending draft is discarded.
    pub fn load(&mut self, regions: RegionSet) {
        debug!("Loading {} regions into annotation engine", regions.len());
        self.regions = regions;
        self.gesture = GestureState::Idle;
    }

    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    /// Hand the region set back, ending the session
    pub fn into_regions(self) -> RegionSet {
        self.regions
    }

    pub fn gesture(&self) -> &GestureState {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, GestureState::Idle)
    }

    pub fn image_box(&self) -> &PixelBox {
        &self.image_box
    }

    /// Update the displayed image bounds (after layout, zoom or window resize)
    pub fn set_image_box(&mut self, image_box: PixelBox) {
        self.image_box = image_box;
    }

    pub fn draw_shape(&self) -> RegionShape {
        self.draw_shape
    }

    pub fn set_draw_shape(&mut self, shape: RegionShape) {
        self.draw_shape = shape;
    }

    /// Rect being dragged out, for preview rendering
    pub fn drawing_rect(&self) -> Option<&NormalizedRect> {
        match &self.gesture {
            GestureState::Drawing { current, .. } => Some(current),
            _ => None,
        }
    }

    pub fn pending_draft(&self) -> Option<&RegionDraft> {
        match &self.gesture {
            GestureState::PendingClassification(draft) => Some(draft),
            _ => None,
        }
    }

    // -- Drawing --

    /// Start a draw gesture. Ignored unless idle.
    pub fn begin_draw(&mut self, start: RatioPoint) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.gesture = GestureState::Drawing {
            anchor: start,
            current: NormalizedRect::at(start),
        };
        true
    }

    /// Recompute the candidate rect for the current pointer position.
    ///
    /// With aspect lock the anchor stays fixed and the box grows in the drag
    /// direction, limited by the room left on that side of the anchor.
    pub fn update_draw(&mut self, point: RatioPoint, aspect_lock: bool) {
        let image_box = self.image_box;
        let GestureState::Drawing { anchor, current } = &mut self.gesture else {
            return;
        };
        let anchor = *anchor;
        let mut rect = NormalizedRect::from_corners(anchor, point);

        if aspect_lock {
            // a drag with no component on an axis grows toward the roomier side
            let leftward = grows_backward(anchor.x, point.x);
            let upward = grows_backward(anchor.y, point.y);
            let room_w = if leftward { anchor.x } else { 1.0 - anchor.x };
            let room_h = if upward { anchor.y } else { 1.0 - anchor.y };

            let (w, h) = apply_aspect_lock(rect.w, rect.h, &image_box);
            let (w, h) = fit_square_within(w, h, room_w, room_h, &image_box);

            rect.x = if leftward { (anchor.x - w).max(0.0) } else { anchor.x };
            rect.y = if upward { (anchor.y - h).max(0.0) } else { anchor.y };
            rect.w = w.min(1.0 - rect.x);
            rect.h = h.min(1.0 - rect.y);
        }

        *current = rect;
    }

    /// Finish the draw gesture.
    ///
    /// Boxes larger than the minimum size on both axes become a draft awaiting
    /// classification; anything smaller is treated as a stray click and dropped.
    pub fn end_draw(&mut self) -> Option<&RegionDraft> {
        let GestureState::Drawing { current, .. } = &self.gesture else {
            return None;
        };
        let rect = *current;
        let min = self.settings.min_draw_size;

        if rect.w > min && rect.h > min {
            let draft = RegionDraft::new(self.draw_shape, rect, self.settings.default_score_weight);
            debug!("Draw finished, draft {} awaiting classification", draft.id);
            self.gesture = GestureState::PendingClassification(draft);
            self.pending_draft()
        } else {
            debug!("Draw discarded ({:.4} x {:.4} below minimum)", rect.w, rect.h);
            self.gesture = GestureState::Idle;
            None
        }
    }

    /// Attach a taxonomy clause to the pending draft and commit it to the region set.
    ///
    /// On validation failure the draft stays pending so it can be corrected.
    pub fn classify(
        &mut self,
        clause_id: &str,
        score_weight: u32,
        description: &str,
    ) -> Result<&Region, AnnotationError> {
        if !matches!(self.gesture, GestureState::PendingClassification(_)) {
            return Err(AnnotationError::NoPendingDraft);
        }
        validate_classification(clause_id, score_weight)?;

        let GestureState::PendingClassification(draft) = std::mem::take(&mut self.gesture) else {
            return Err(AnnotationError::NoPendingDraft);
        };
        let region = draft.into_region(clause_id.to_string(), score_weight, description.to_string());
        info!(
            "Region {} classified as {} (weight {})",
            region.id, region.clause_id, region.score_weight
        );
        self.regions.push(region);

        self.regions
            .as_slice()
            .last()
            .ok_or(AnnotationError::NoPendingDraft)
    }

    /// Drop the pending draft (classification dialog dismissed)
    pub fn cancel_pending(&mut self) -> Option<RegionDraft> {
        if !matches!(self.gesture, GestureState::PendingClassification(_)) {
            return None;
        }
        match std::mem::take(&mut self.gesture) {
            GestureState::PendingClassification(draft) => Some(draft),
            _ => None,
        }
    }

    /// Change the taxonomy linkage of an existing region
    pub fn reclassify(
        &mut self,
        region_id: &str,
        clause_id: &str,
        score_weight: u32,
        description: &str,
    ) -> Result<(), AnnotationError> {
        validate_classification(clause_id, score_weight)?;
        let region = self
            .regions
            .get_mut(region_id)
            .ok_or_else(|| AnnotationError::UnknownRegion(region_id.to_string()))?;

        region.clause_id = clause_id.to_string();
        region.score_weight = score_weight;
        region.description = description.to_string();
        Ok(())
    }

    // -- Editing committed regions --

    /// Translate a region, clamped so it stays on the image. Size is unchanged.
    pub fn move_region(&mut self, region_id: &str, dx: f64, dy: f64) -> Result<NormalizedRect, AnnotationError> {
        let region = self
            .regions
            .get_mut(region_id)
            .ok_or_else(|| AnnotationError::UnknownRegion(region_id.to_string()))?;

        region.rect = clamp_region_origin(&region.rect, dx, dy);
        Ok(region.rect)
    }

    /// Grow or shrink a region from its fixed top-left corner.
    ///
    /// Width and height never drop below the minimum resize size and never
    /// extend past the right/bottom edge of the image.
    pub fn resize_region(
        &mut self,
        region_id: &str,
        dx: f64,
        dy: f64,
        aspect_lock: bool,
    ) -> Result<NormalizedRect, AnnotationError> {
        let min = self.settings.min_resize_size;
        let image_box = self.image_box;
        let region = self
            .regions
            .get_mut(region_id)
            .ok_or_else(|| AnnotationError::UnknownRegion(region_id.to_string()))?;

        let rect = &mut region.rect;
        let room_w = 1.0 - rect.x;
        let room_h = 1.0 - rect.y;
        let w = (rect.w + dx).max(min);
        let h = (rect.h + dy).max(min);

        let (w, h) = if aspect_lock {
            let (w, h) = apply_aspect_lock(w, h, &image_box);
            fit_square_within(w, h, room_w, room_h, &image_box)
        } else {
            (w.min(room_w), h.min(room_h))
        };

        rect.w = w;
        rect.h = h;
        Ok(*rect)
    }

    /// Remove a region. An active move/resize of that region is dropped too.
    pub fn delete_region(&mut self, region_id: &str) -> Option<Region> {
        let removed = self.regions.remove(region_id)?;
        let editing_removed = match &self.gesture {
            GestureState::Moving { region_id: active, .. } | GestureState::Resizing { region_id: active, .. } => {
                active == region_id
            }
            _ => false,
        };
        if editing_removed {
            self.gesture = GestureState::Idle;
        }
        info!("Region {} deleted", removed.id);
        Some(removed)
    }

    // -- Pointer adapter --

    /// Route a pointer-down. Landing on a region body or handle starts a
    /// move/resize and never a draw on the image underneath.
    pub fn pointer_down(&mut self, pos: PixelPoint, target: PointerTarget) -> bool {
        if !self.is_idle() {
            return false;
        }
        let point = to_ratio(pos, &self.image_box);

        match target {
            PointerTarget::Image => self.begin_draw(point),
            PointerTarget::RegionBody(region_id) => {
                if self.regions.get(&region_id).is_none() {
                    return false;
                }
                self.gesture = GestureState::Moving { region_id, last: point };
                true
            }
            PointerTarget::ResizeHandle(region_id) => {
                if self.regions.get(&region_id).is_none() {
                    return false;
                }
                self.gesture = GestureState::Resizing { region_id, last: point };
                true
            }
        }
    }

    /// Route a pointer-move to the active gesture. Move and resize apply
    /// the delta since the previous pointer position.
    pub fn pointer_move(&mut self, pos: PixelPoint, aspect_lock: bool) {
        let point = to_ratio(pos, &self.image_box);

        match &self.gesture {
            GestureState::Drawing { .. } => self.update_draw(point, aspect_lock),
            GestureState::Moving { region_id, last } => {
                let (region_id, last) = (region_id.clone(), *last);
                if let Err(e) = self.move_region(&region_id, point.x - last.x, point.y - last.y) {
                    debug!("Move gesture ignored: {}", e);
                }
                self.gesture = GestureState::Moving { region_id, last: point };
            }
            GestureState::Resizing { region_id, last } => {
                let (region_id, last) = (region_id.clone(), *last);
                if let Err(e) = self.resize_region(&region_id, point.x - last.x, point.y - last.y, aspect_lock) {
                    debug!("Resize gesture ignored: {}", e);
                }
                self.gesture = GestureState::Resizing { region_id, last: point };
            }
            GestureState::Idle | GestureState::PendingClassification(_) => {}
        }
    }

    /// Route a pointer-up (or pointer leaving the canvas)
    pub fn pointer_up(&mut self) -> Option<&RegionDraft> {
        match &self.gesture {
            GestureState::Drawing { .. } => self.end_draw(),
            GestureState::Moving { .. } | GestureState::Resizing { .. } => {
                self.gesture = GestureState::Idle;
                None
            }
            GestureState::Idle | GestureState::PendingClassification(_) => None,
        }
    }
}

impl Default for AnnotationEngine {
    fn default() -> Self {
        Self::new(AnnotationSettings::default())
    }
}

fn grows_backward(anchor: f64, pointer: f64) -> bool {
    if pointer == anchor {
        anchor > 1.0 - anchor
    } else {
        pointer < anchor
    }
}

fn validate_classification(clause_id: &str, score_weight: u32) -> Result<(), AnnotationError> {
    if clause_id.trim().is_empty() {
        return Err(AnnotationError::MissingClause);
    }
    if score_weight == 0 {
        return Err(AnnotationError::ZeroWeight);
    }
    Ok(())
}
