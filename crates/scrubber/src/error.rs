use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Result type used by the scrubber crate.
pub type Result<T> = std::result::Result<T, ScrubError>;

/// Errors produced while loading a video or driving a scrub session.
#[derive(Debug)]
pub enum ScrubError {
    InvalidLayout {
        width: f64,
        height: f64,
    },
    InvalidDuration(f64),
    MissingDuration(PathBuf),
    NoVideoTrack(PathBuf),
    DegenerateRange {
        lower: f64,
        upper: f64,
    },
    ExtractionFailed {
        seconds: f64,
        reason: String,
    },
    InvalidConfig {
        reason: String,
    },
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },
    ConfigSerialization {
        path: PathBuf,
        source: serde_json::Error,
    },
    VideoNotLoaded,
    WorkerBusy,
    WorkerDisconnected,
    WorkerTimeout,
    Media(media_ffmpeg::MediaFfmpegError),
}

impl ScrubError {
    /// Wraps any extraction failure at `seconds` into [`ScrubError::ExtractionFailed`].
    pub fn extraction_failed(seconds: f64, reason: impl Display) -> Self {
        Self::ExtractionFailed {
            seconds,
            reason: reason.to_string(),
        }
    }
}

impl Display for ScrubError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLayout { width, height } => {
                write!(f, "invalid strip layout: {width}x{height}")
            }
            Self::InvalidDuration(seconds) => write!(f, "invalid video duration: {seconds}"),
            Self::MissingDuration(path) => {
                write!(f, "video duration is missing: {}", path.display())
            }
            Self::NoVideoTrack(path) => write!(f, "no video track in {}", path.display()),
            Self::DegenerateRange { lower, upper } => {
                write!(f, "scrub range collapsed: {lower}..{upper}")
            }
            Self::ExtractionFailed { seconds, reason } => {
                write!(f, "frame extraction failed at {seconds}s: {reason}")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid scrubber config: {reason}"),
            Self::ConfigIo { path, source } => {
                write!(f, "failed to read config {} ({source})", path.display())
            }
            Self::ConfigSerialization { path, source } => {
                write!(f, "failed to parse config {} ({source})", path.display())
            }
            Self::VideoNotLoaded => write!(f, "no video is loaded"),
            Self::WorkerBusy => write!(f, "frame worker request queue is full"),
            Self::WorkerDisconnected => write!(f, "frame worker disconnected"),
            Self::WorkerTimeout => write!(f, "timed out waiting for the frame worker"),
            Self::Media(err) => write!(f, "media backend error: {err}"),
        }
    }
}

impl std::error::Error for ScrubError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigIo { source, .. } => Some(source),
            Self::ConfigSerialization { source, .. } => Some(source),
            Self::Media(err) => Some(err),
            _ => None,
        }
    }
}

impl From<media_ffmpeg::MediaFfmpegError> for ScrubError {
    fn from(value: media_ffmpeg::MediaFfmpegError) -> Self {
        Self::Media(value)
    }
}
