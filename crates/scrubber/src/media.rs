use std::path::{Path, PathBuf};
use std::sync::Arc;

use media_ffmpeg::{FrameIndex, VideoStreamInfo};
use tracing::debug;

use crate::error::{Result, ScrubError};
use crate::geometry::Size;
use crate::time::FrameTime;

/// Still image produced by the frame extractor.
///
/// The payload is tightly packed RGBA8 and shared, so cloning a frame is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<[u8]>,
}

impl FrameImage {
    /// Builds a frame, checking that the payload matches the dimensions.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize).checked_mul(height as usize)?.checked_mul(4)?;
        (rgba.len() == expected).then(|| Self {
            width,
            height,
            rgba: rgba.into(),
        })
    }
}

/// Video track properties needed to lay out the strip.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTrack {
    /// Display width, after any non-square pixel correction.
    pub natural_width: f64,
    pub natural_height: f64,
    /// Stream as read by `ffprobe`, reused when an FFmpeg extractor is bound.
    pub stream: Option<VideoStreamInfo>,
}

/// A video the caller wants to scrub.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAsset {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub video: Option<VideoTrack>,
}

impl VideoAsset {
    pub fn duration(&self) -> f64 {
        self.duration_seconds
    }

    /// Natural size of the first video track.
    pub fn video_track_natural_size(&self) -> Result<Size> {
        self.video
            .as_ref()
            .map(|track| Size::new(track.natural_width, track.natural_height))
            .ok_or_else(|| ScrubError::NoVideoTrack(self.path.clone()))
    }
}

/// Produces still frames for one bound asset.
///
/// Implementations run on the frame worker thread.
pub trait FrameExtractor: Send {
    /// Returns the frame on screen at exactly `at`, or `ExtractionFailed`.
    fn extract_frame(&mut self, at: FrameTime) -> Result<FrameImage>;
}

/// Media operations required by the scrubber.
pub trait MediaBackend {
    type Extractor: FrameExtractor + 'static;

    /// Reads duration and video track information.
    fn open_asset(&self, path: &Path) -> Result<VideoAsset>;

    /// Creates the extractor used for the whole load session of `asset`.
    fn bind_asset(&self, asset: &VideoAsset) -> Result<Self::Extractor>;
}

/// FFmpeg CLI-backed backend used by production wiring.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegMediaBackend;

impl MediaBackend for FfmpegMediaBackend {
    type Extractor = FfmpegFrameExtractor;

    fn open_asset(&self, path: &Path) -> Result<VideoAsset> {
        let info = media_ffmpeg::probe_media(path)?;
        let duration_seconds = info
            .best_duration_seconds()
            .ok_or_else(|| ScrubError::MissingDuration(path.to_path_buf()))?;
        let video = info.video.map(|stream| VideoTrack {
            natural_width: stream.display_width(),
            natural_height: f64::from(stream.height),
            stream: Some(stream),
        });

        Ok(VideoAsset {
            path: info.path,
            duration_seconds,
            video,
        })
    }

    fn bind_asset(&self, asset: &VideoAsset) -> Result<Self::Extractor> {
        let probed = asset.video.as_ref().and_then(|track| track.stream.clone());
        let stream = match probed {
            Some(stream) => stream,
            None => media_ffmpeg::probe_media(&asset.path)?
                .video
                .ok_or_else(|| ScrubError::NoVideoTrack(asset.path.clone()))?,
        };
        let index = FrameIndex::build(&asset.path, &stream)?;
        debug!(
            path = ?asset.path,
            frames = index.timestamps().len(),
            "indexed video frames"
        );
        Ok(FfmpegFrameExtractor { index })
    }
}

/// Exact-frame extractor over an indexed video.
#[derive(Debug, Clone)]
pub struct FfmpegFrameExtractor {
    index: FrameIndex,
}

impl FrameExtractor for FfmpegFrameExtractor {
    fn extract_frame(&mut self, at: FrameTime) -> Result<FrameImage> {
        let time_base = self.index.time_base();
        let start = self.index.timestamps().first().copied().unwrap_or(0);
        let target = start.saturating_add(at.rescale_to(time_base.into()));

        let decoded = self
            .index
            .decode_at(target)
            .map_err(|error| ScrubError::extraction_failed(at.seconds(), error))?;
        FrameImage::from_rgba(decoded.width, decoded.height, decoded.rgba).ok_or_else(|| {
            ScrubError::extraction_failed(at.seconds(), "decoded frame has an unexpected size")
        })
    }
}
