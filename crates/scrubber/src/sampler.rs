use tracing::{debug, warn};

use crate::error::{Result, ScrubError};
use crate::geometry::Size;
use crate::media::{FrameExtractor, FrameImage};
use crate::time::FrameTime;

/// Frame size, count and sample timestamps for one strip.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePlan {
    pub frame_width: f64,
    pub frame_height: f64,
    pub frame_count: usize,
    pub sample_interval: f64,
    pub duration_seconds: f64,
    /// Ascending sample times in seconds, all strictly below the duration.
    pub timestamps: Vec<f64>,
}

/// One slot of the strip. `image` is `None` when extraction failed.
#[derive(Debug, Clone, PartialEq)]
pub struct StripFrame {
    pub seconds: f64,
    pub time: FrameTime,
    pub x_offset: f64,
    pub image: Option<FrameImage>,
}

/// Thumbnails covering the strip, in timeline order.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailStrip {
    pub frames: Vec<StripFrame>,
    pub frame_width: f64,
    pub frame_height: f64,
    pub sample_interval: f64,
}

impl ThumbnailStrip {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Image of the first slot, shown on the thumb before any drag.
    pub fn preview_image(&self) -> Option<&FrameImage> {
        self.frames.first().and_then(|frame| frame.image.as_ref())
    }

    /// Number of slots whose extraction failed.
    pub fn holes(&self) -> usize {
        self.frames
            .iter()
            .filter(|frame| frame.image.is_none())
            .count()
    }
}

/// Plans and samples thumbnail strips.
pub struct ThumbnailSampler;

impl ThumbnailSampler {
    /// Works out how many frames fill `strip_width` and where to sample them.
    ///
    /// Frames take the full strip height and keep the video aspect ratio. When
    /// the interval between samples exceeds the duration, or the duration is
    /// zero, the plan has no timestamps.
    ///
    /// # Example
    /// ```
    /// use scrubber::{Size, ThumbnailSampler};
    ///
    /// let plan = ThumbnailSampler::plan(10.0, Size::new(1.0, 1.0), 300.0, 60.0)
    ///     .expect("valid layout");
    /// assert_eq!(plan.frame_count, 5);
    /// assert_eq!(plan.timestamps, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
    /// ```
    pub fn plan(
        duration_seconds: f64,
        natural_size: Size,
        strip_width: f64,
        strip_height: f64,
    ) -> Result<SamplePlan> {
        if !duration_seconds.is_finite() || duration_seconds < 0.0 {
            return Err(ScrubError::InvalidDuration(duration_seconds));
        }
        if !Size::new(strip_width, strip_height).is_positive() {
            return Err(ScrubError::InvalidLayout {
                width: strip_width,
                height: strip_height,
            });
        }
        let aspect = natural_size
            .aspect_ratio()
            .ok_or(ScrubError::InvalidLayout {
                width: natural_size.width,
                height: natural_size.height,
            })?;

        let frame_height = strip_height;
        // Sub-pixel frames would ask for more slots than the strip has pixels.
        let frame_width = frame_height * aspect;
        if !frame_width.is_finite() || frame_width < 1.0 {
            return Err(ScrubError::InvalidLayout {
                width: frame_width,
                height: frame_height,
            });
        }

        let frame_count = (strip_width / frame_width).ceil() as usize;
        let sample_interval = duration_seconds / frame_count as f64;

        let timestamps = if sample_interval > duration_seconds {
            Vec::new()
        } else {
            (0..frame_count)
                .map(|slot| slot as f64 * sample_interval)
                .take_while(|seconds| *seconds < duration_seconds)
                .collect()
        };

        debug!(
            frame_count,
            frame_width,
            frame_height,
            sample_interval,
            planned = timestamps.len(),
            "planned thumbnail strip"
        );

        Ok(SamplePlan {
            frame_width,
            frame_height,
            frame_count,
            sample_interval,
            duration_seconds,
            timestamps,
        })
    }

    /// Extracts every planned frame in order.
    ///
    /// A failed slot is kept as a hole and sampling carries on.
    pub fn sample_all<E>(plan: &SamplePlan, extractor: &mut E) -> ThumbnailStrip
    where
        E: FrameExtractor + ?Sized,
    {
        let frames = plan
            .timestamps
            .iter()
            .enumerate()
            .map(|(slot, &seconds)| {
                let time = FrameTime::from_seconds(seconds);
                let image = match extractor.extract_frame(time) {
                    Ok(image) => Some(image),
                    Err(error) => {
                        warn!(slot, seconds, %error, "thumbnail extraction failed");
                        None
                    }
                };
                StripFrame {
                    seconds,
                    time,
                    x_offset: slot as f64 * plan.frame_width,
                    image,
                }
            })
            .collect();

        ThumbnailStrip {
            frames,
            frame_width: plan.frame_width,
            frame_height: plan.frame_height,
            sample_interval: plan.sample_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::{Result, ScrubError};
    use crate::geometry::Size;
    use crate::media::{FrameExtractor, FrameImage};
    use crate::time::FrameTime;

    use super::ThumbnailSampler;

    #[test]
    fn ten_second_clip_in_300px_strip_samples_every_two_seconds() {
        let plan = ThumbnailSampler::plan(10.0, Size::new(1280.0, 1280.0), 300.0, 60.0)
            .expect("valid plan");

        assert_eq!(plan.frame_width, 60.0);
        assert_eq!(plan.frame_count, 5);
        assert_eq!(plan.sample_interval, 2.0);
        assert_eq!(plan.timestamps, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn frame_count_rounds_up_to_cover_the_strip() {
        let plan = ThumbnailSampler::plan(12.0, Size::new(16.0, 9.0), 309.0, 44.0)
            .expect("valid plan");

        let expected = (309.0_f64 / (44.0 * 16.0 / 9.0)).ceil() as usize;
        assert_eq!(plan.frame_count, expected);
        assert_eq!(plan.timestamps.len(), expected);
        assert_eq!(plan.timestamps[0], 0.0);
        assert!(plan.timestamps.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(plan.timestamps.iter().all(|seconds| *seconds < 12.0));
    }

    #[test]
    fn half_second_clip_still_samples_every_slot() {
        let plan = ThumbnailSampler::plan(0.5, Size::new(1.0, 1.0), 150.0, 60.0)
            .expect("valid plan");

        assert_eq!(plan.frame_count, 3);
        assert!(plan.sample_interval < 0.5);
        assert_eq!(plan.timestamps.len(), 3);
    }

    #[test]
    fn interval_equal_to_duration_is_not_degenerate() {
        let plan = ThumbnailSampler::plan(1.0, Size::new(1.0, 1.0), 60.0, 60.0)
            .expect("valid plan");

        assert_eq!(plan.frame_count, 1);
        assert_eq!(plan.sample_interval, 1.0);
        assert_eq!(plan.timestamps, vec![0.0]);
    }

    #[test]
    fn zero_duration_clip_yields_empty_plan() {
        let plan = ThumbnailSampler::plan(0.0, Size::new(16.0, 9.0), 300.0, 60.0)
            .expect("zero duration is not an error");

        assert!(plan.timestamps.is_empty());
    }

    #[test]
    fn invalid_layouts_are_rejected() {
        let natural = Size::new(16.0, 9.0);
        for (width, height) in [(-1.0, 60.0), (300.0, 0.0), (f64::NAN, 60.0), (300.0, f64::INFINITY)]
        {
            let error = ThumbnailSampler::plan(10.0, natural, width, height)
                .expect_err("layout must be rejected");
            assert!(matches!(error, ScrubError::InvalidLayout { .. }));
        }

        let error = ThumbnailSampler::plan(10.0, Size::new(16.0, 0.0), 300.0, 60.0)
            .expect_err("zero height video");
        assert!(matches!(error, ScrubError::InvalidLayout { .. }));
    }

    #[test]
    fn sub_pixel_frames_are_rejected_instead_of_flooding_the_strip() {
        let error = ThumbnailSampler::plan(10.0, Size::new(1.0, 100_000.0), 300.0, 60.0)
            .expect_err("frame width below one pixel");
        assert!(matches!(error, ScrubError::InvalidLayout { .. }));

        let plan = ThumbnailSampler::plan(10.0, Size::new(1.0, 60.0), 300.0, 60.0)
            .expect("one pixel wide frames are fine");
        assert_eq!(plan.frame_count, 300);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let error = ThumbnailSampler::plan(-1.0, Size::new(16.0, 9.0), 300.0, 60.0)
            .expect_err("negative duration");
        assert!(matches!(error, ScrubError::InvalidDuration(_)));
    }

    #[test]
    fn sample_all_requests_quantized_times_and_keeps_holes() {
        let plan = ThumbnailSampler::plan(10.0, Size::new(1.0, 1.0), 300.0, 60.0)
            .expect("valid plan");
        let mut extractor = ScriptedExtractor {
            fail_at: vec![FrameTime::from_seconds(4.0)],
            calls: Vec::new(),
        };

        let strip = ThumbnailSampler::sample_all(&plan, &mut extractor);

        let requested: Vec<i64> = extractor.calls.iter().map(|time| time.ticks).collect();
        assert_eq!(requested, vec![0, 120, 240, 360, 480]);
        assert_eq!(strip.len(), 5);
        assert_eq!(strip.holes(), 1);
        assert!(strip.frames[2].image.is_none());
        assert_eq!(strip.frames[3].x_offset, 180.0);
        let preview = strip.preview_image().expect("slot zero sampled");
        assert_eq!(preview.rgba[0], 0);
    }

    #[test]
    fn failed_first_slot_leaves_no_preview() {
        let plan = ThumbnailSampler::plan(10.0, Size::new(1.0, 1.0), 300.0, 60.0)
            .expect("valid plan");
        let mut extractor = ScriptedExtractor {
            fail_at: vec![FrameTime::ZERO],
            calls: Vec::new(),
        };

        let strip = ThumbnailSampler::sample_all(&plan, &mut extractor);

        assert!(strip.preview_image().is_none());
        assert_eq!(strip.holes(), 1);
    }

    struct ScriptedExtractor {
        fail_at: Vec<FrameTime>,
        calls: Vec<FrameTime>,
    }

    impl FrameExtractor for ScriptedExtractor {
        fn extract_frame(&mut self, at: FrameTime) -> Result<FrameImage> {
            self.calls.push(at);
            if self.fail_at.contains(&at) {
                return Err(ScrubError::extraction_failed(at.seconds(), "scripted failure"));
            }
            Ok(FrameImage {
                width: 1,
                height: 1,
                rgba: Arc::from(vec![(at.ticks / 60) as u8; 4]),
            })
        }
    }
}
