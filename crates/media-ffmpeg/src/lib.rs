//! FFmpeg CLI primitives used to sample still frames out of a video.

mod decode;
mod error;
mod probe;
mod time;

pub use decode::{DecodedVideoFrame, FrameIndex, decode_rgba_frame_at};
pub use error::{MediaFfmpegError, Result};
pub use probe::{MediaInfo, VideoStreamInfo, probe_media};
pub use time::{Rational, rescale};
