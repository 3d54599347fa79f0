//! UI-agnostic engine for a video thumbnail scrubber.

pub mod config;
pub mod controller;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod media;
pub mod range;
pub mod sampler;
pub mod time;
pub mod worker;

pub use config::ScrubberConfig;
pub use controller::{ControllerState, ScrubCommand, ScrubController, ScrubEvent, StripSnapshot};
pub use error::{Result, ScrubError};
pub use geometry::{EdgeInsets, Point, Rect, Size};
pub use layout::{HostLayout, StripGeometry};
pub use media::{
    FfmpegFrameExtractor, FfmpegMediaBackend, FrameExtractor, FrameImage, MediaBackend,
    VideoAsset, VideoTrack,
};
pub use range::ScrubRange;
pub use sampler::{SamplePlan, StripFrame, ThumbnailSampler, ThumbnailStrip};
pub use time::{EXTRACTION_TIME_BASE, FrameTime, Rational, rescale};
pub use worker::RequestToken;
