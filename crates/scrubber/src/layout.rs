use crate::config::ScrubberConfig;
use crate::error::{Result, ScrubError};
use crate::geometry::{EdgeInsets, Rect, Size};
use crate::sampler::SamplePlan;

/// Host view bounds and the margins around the thumbnail strip, read at load time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostLayout {
    pub bounds: Size,
    pub insets: EdgeInsets,
}

impl HostLayout {
    pub fn new(bounds: Size, insets: EdgeInsets) -> Self {
        Self { bounds, insets }
    }

    /// Uses the configured corner insets as strip margins.
    pub fn with_insets(bounds: Size, config: &ScrubberConfig) -> Self {
        Self::new(bounds, config.corner_insets)
    }

    /// Pixel size of the strip inside the insets.
    pub fn strip_size(&self) -> Result<Size> {
        let strip = Size::new(
            self.bounds.width - self.insets.horizontal(),
            self.bounds.height - self.insets.vertical(),
        );
        if !strip.is_positive() {
            return Err(ScrubError::InvalidLayout {
                width: strip.width,
                height: strip.height,
            });
        }
        Ok(strip)
    }
}

/// Placement of the thumb and its travel span, in host-view coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripGeometry {
    pub thumb_size: Size,
    pub top: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl StripGeometry {
    /// The thumb center travels from half a frame inside the left inset to half
    /// a frame inside the right inset. When a frame is wider than the strip the
    /// span collapses onto the lower bound.
    pub fn new(layout: &HostLayout, plan: &SamplePlan) -> Self {
        let half_frame = plan.frame_width / 2.0;
        let lower_bound = layout.insets.left + half_frame;
        let upper_bound = (layout.bounds.width - half_frame - layout.insets.right).max(lower_bound);
        Self {
            thumb_size: Size::new(plan.frame_width, plan.frame_height),
            top: layout.insets.top,
            lower_bound,
            upper_bound,
        }
    }

    /// Thumb rectangle centered horizontally on `center_x`.
    pub fn thumb_rect(&self, center_x: f64) -> Rect {
        Rect::new(
            center_x - self.thumb_size.width / 2.0,
            self.top,
            self.thumb_size.width,
            self.thumb_size.height,
        )
    }

    pub fn is_degenerate(&self) -> bool {
        self.upper_bound <= self.lower_bound
    }
}
