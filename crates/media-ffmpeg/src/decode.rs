use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{MediaFfmpegError, Result};
use crate::probe::VideoStreamInfo;
use crate::time::Rational;

/// A decoded video frame in RGBA format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedVideoFrame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    pub pts: i64,
    pub time_base: Rational,
}

/// Presentation timestamps of every frame in the first video stream.
///
/// Built once per video so that repeated exact-frame lookups only pay for one
/// decode each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameIndex {
    path: PathBuf,
    width: u32,
    height: u32,
    time_base: Rational,
    timestamps: Vec<i64>,
    end: i64,
}

impl FrameIndex {
    /// Reads frame timestamps for `video` with `ffprobe -show_frames`.
    ///
    /// # Example
    /// ```no_run
    /// use media_ffmpeg::{FrameIndex, probe_media};
    ///
    /// let info = probe_media("sample.mp4").expect("probe should succeed");
    /// let video = info.video.expect("video stream exists");
    /// let index = FrameIndex::build("sample.mp4", &video).expect("index should build");
    /// assert!(!index.timestamps().is_empty());
    /// ```
    pub fn build(path: impl AsRef<Path>, video: &VideoStreamInfo) -> Result<Self> {
        let path = path.as_ref();
        let timestamps = read_video_best_effort_timestamps(path)?;
        Self::from_timestamps(path, video, timestamps)
    }

    /// Creates an index from already known timestamps.
    pub fn from_timestamps(
        path: impl AsRef<Path>,
        video: &VideoStreamInfo,
        mut timestamps: Vec<i64>,
    ) -> Result<Self> {
        let path = path.as_ref();
        timestamps.sort_unstable();
        timestamps.dedup();
        let (Some(&first), Some(&last)) = (timestamps.first(), timestamps.last()) else {
            return Err(MediaFfmpegError::NoFramesIndexed(path.to_path_buf()));
        };

        let last_frame_duration = match timestamps.len() {
            0 | 1 => 1,
            len => (last - timestamps[len - 2]).max(1),
        };
        let stream_end = video
            .duration_ts
            .map(|duration| video.start_pts.unwrap_or(first) + duration);
        let end = stream_end
            .unwrap_or(last + last_frame_duration)
            .max(last + 1);

        Ok(Self {
            path: path.to_path_buf(),
            width: video.width,
            height: video.height,
            time_base: video.time_base,
            timestamps,
            end,
        })
    }

    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Exclusive end of the stream in stream ticks.
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Returns the timestamp of the frame on screen at `target`.
    ///
    /// This is the last frame whose timestamp is `<= target`. Targets before the
    /// first frame resolve to the first frame; targets at or past the end of the
    /// stream are out of range.
    pub fn frame_at(&self, target: i64) -> Result<i64> {
        let first = self.timestamps[0];
        if target >= self.end {
            return Err(MediaFfmpegError::TimestampOutOfRange {
                target,
                first,
                end: self.end,
            });
        }

        let shown = self.timestamps.partition_point(|timestamp| *timestamp <= target);
        Ok(self.timestamps[shown.saturating_sub(1)])
    }

    /// Decodes the frame on screen at `target` stream ticks.
    pub fn decode_at(&self, target: i64) -> Result<DecodedVideoFrame> {
        let pts = self.frame_at(target)?;
        let rgba = decode_rgba_frame_at(&self.path, pts)?;
        let expected_size = self.width as usize * self.height as usize * 4;
        if rgba.len() != expected_size {
            return Err(MediaFfmpegError::Parse {
                context: "decoded rgba size",
                value: format!("expected {expected_size} bytes, got {}", rgba.len()),
            });
        }

        Ok(DecodedVideoFrame {
            width: self.width,
            height: self.height,
            rgba,
            pts,
            time_base: self.time_base,
        })
    }
}

fn read_video_best_effort_timestamps(path: &Path) -> Result<Vec<i64>> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_frames",
            "-show_entries",
            "frame=best_effort_timestamp",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .map_err(|source| MediaFfmpegError::Io {
            context: "run ffprobe show_frames",
            source,
        })?;

    if !output.status.success() {
        return Err(MediaFfmpegError::CommandFailed {
            command: format!("ffprobe show_frames {}", path.display()),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let stdout = String::from_utf8(output.stdout)?;
    parse_timestamp_lines(&stdout)
}

fn parse_timestamp_lines(stdout: &str) -> Result<Vec<i64>> {
    let mut timestamps = Vec::new();
    for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
        let Some(raw_ts) = line.split(',').next().map(str::trim) else {
            continue;
        };
        if raw_ts.is_empty() || raw_ts == "N/A" {
            continue;
        }
        let ts = raw_ts.parse::<i64>().map_err(|_| MediaFfmpegError::Parse {
            context: "best_effort_timestamp",
            value: raw_ts.to_string(),
        })?;
        timestamps.push(ts);
    }
    Ok(timestamps)
}

/// Decodes the first frame whose timestamp is at or after `pts` as raw RGBA bytes.
pub fn decode_rgba_frame_at(path: impl AsRef<Path>, pts: i64) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let filter = format!("select=gte(pts\\,{pts}),format=rgba");
    let output = Command::new("ffmpeg")
        .arg("-hide_banner")
        .arg("-v")
        .arg("error")
        .arg("-i")
        .arg(path)
        .arg("-map")
        .arg("0:v:0")
        .arg("-vf")
        .arg(&filter)
        .arg("-frames:v")
        .arg("1")
        .arg("-f")
        .arg("rawvideo")
        .arg("-pix_fmt")
        .arg("rgba")
        .arg("-")
        .output()
        .map_err(|source| MediaFfmpegError::Io {
            context: "run ffmpeg decode frame",
            source,
        })?;

    if !output.status.success() {
        return Err(MediaFfmpegError::CommandFailed {
            command: format!("ffmpeg decode frame {}", path.display()),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output.stdout)
}
