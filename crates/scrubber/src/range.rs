use crate::error::{Result, ScrubError};

/// Draggable span of the thumb and the drag anchors.
///
/// All values are host-view x coordinates. `current_position` always stays
/// within `lower_bound..=upper_bound`.
///
/// # Example
/// ```
/// use scrubber::ScrubRange;
///
/// let mut range = ScrubRange::new(10.0, 110.0);
/// range.begin_drag(50.0, 10.0);
/// assert_eq!(range.update_position(70.0), 30.0);
/// assert!((range.percent().expect("non-degenerate") - 0.2).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrubRange {
    lower_bound: f64,
    upper_bound: f64,
    dragging: bool,
    anchor_thumb_position: f64,
    anchor_pointer_position: f64,
    current_position: f64,
}

impl ScrubRange {
    /// Creates a range resting on its lower bound.
    ///
    /// An inverted pair collapses onto `lower_bound`.
    pub fn new(lower_bound: f64, upper_bound: f64) -> Self {
        debug_assert!(
            upper_bound >= lower_bound,
            "scrub range bounds are inverted: {lower_bound}..{upper_bound}"
        );
        Self {
            lower_bound,
            upper_bound: upper_bound.max(lower_bound),
            dragging: false,
            anchor_thumb_position: 0.0,
            anchor_pointer_position: 0.0,
            current_position: lower_bound,
        }
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    pub fn current_position(&self) -> f64 {
        self.current_position
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn is_degenerate(&self) -> bool {
        self.upper_bound <= self.lower_bound
    }

    /// Records where the pointer and the thumb were when the drag began.
    pub fn begin_drag(&mut self, anchor_pointer: f64, anchor_thumb: f64) {
        self.anchor_pointer_position = anchor_pointer;
        self.anchor_thumb_position = anchor_thumb;
        self.dragging = true;
    }

    /// Moves the thumb by the pointer displacement since the drag began.
    pub fn update_position(&mut self, pointer: f64) -> f64 {
        let displacement = pointer - self.anchor_pointer_position;
        self.current_position = self.clamp(self.anchor_thumb_position + displacement);
        self.current_position
    }

    /// Places the thumb directly, clamped to the bounds.
    pub fn set_position(&mut self, position: f64) -> f64 {
        self.current_position = self.clamp(position);
        self.current_position
    }

    /// Places the thumb at `percent` of the span.
    pub fn set_percent(&mut self, percent: f64) -> f64 {
        let span = self.upper_bound - self.lower_bound;
        self.set_position(self.lower_bound + span * percent.clamp(0.0, 1.0))
    }

    /// Normalized thumb position in `0.0..=1.0`.
    pub fn percent(&self) -> Result<f64> {
        if self.is_degenerate() {
            return Err(ScrubError::DegenerateRange {
                lower: self.lower_bound,
                upper: self.upper_bound,
            });
        }
        let percent =
            (self.current_position - self.lower_bound) / (self.upper_bound - self.lower_bound);
        Ok(percent.clamp(0.0, 1.0))
    }

    /// Ends the drag. The thumb stays where it was released.
    pub fn end_drag(&mut self) {
        self.dragging = false;
        self.anchor_pointer_position = 0.0;
        self.anchor_thumb_position = 0.0;
    }

    /// Ends any drag and parks the thumb on the lower bound.
    pub fn reset(&mut self) {
        self.end_drag();
        self.current_position = self.lower_bound;
    }

    fn clamp(&self, candidate: f64) -> f64 {
        if candidate.is_nan() {
            return self.current_position;
        }
        candidate.clamp(self.lower_bound, self.upper_bound)
    }
}
