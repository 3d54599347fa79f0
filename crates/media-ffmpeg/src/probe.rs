use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{MediaFfmpegError, Result};
use crate::time::Rational;

/// First video stream of a probed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoStreamInfo {
    pub index: u32,
    pub codec_name: Option<String>,
    pub time_base: Rational,
    pub width: u32,
    pub height: u32,
    pub sample_aspect_ratio: Option<Rational>,
    pub frame_rate: Option<Rational>,
    pub start_pts: Option<i64>,
    pub duration_ts: Option<i64>,
}

impl VideoStreamInfo {
    /// Display width after applying the sample aspect ratio.
    ///
    /// Anamorphic streams store fewer horizontal pixels than they display.
    pub fn display_width(&self) -> f64 {
        let sar = self
            .sample_aspect_ratio
            .filter(|sar| sar.num > 0)
            .map_or(1.0, Rational::as_f64);
        f64::from(self.width) * sar
    }
}

/// Media probe result.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub stream_count: usize,
    pub video: Option<VideoStreamInfo>,
    pub duration_seconds: Option<f64>,
}

impl MediaInfo {
    /// Best known duration in seconds.
    ///
    /// Prefers the container duration and falls back to the video stream duration.
    pub fn best_duration_seconds(&self) -> Option<f64> {
        self.duration_seconds.or_else(|| {
            let video = self.video.as_ref()?;
            let duration_ts = video.duration_ts?;
            Some(video.time_base.ticks_to_seconds(duration_ts))
        })
    }
}

/// Probes a media file via `ffprobe`.
///
/// Files without a video stream still probe successfully with `video: None`.
///
/// # Example
/// ```no_run
/// use media_ffmpeg::probe_media;
///
/// let info = probe_media("sample.mp4").expect("probe should succeed");
/// let video = info.video.expect("video stream exists");
/// assert!(video.width > 0);
/// ```
pub fn probe_media(path: impl AsRef<Path>) -> Result<MediaInfo> {
    let path = path.as_ref();

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "stream=index,codec_type,codec_name,time_base,width,height,sample_aspect_ratio,r_frame_rate,start_pts,duration_ts",
            "-of",
            "compact=p=0:nk=0",
        ])
        .arg(path)
        .output()
        .map_err(|source| MediaFfmpegError::Io {
            context: "run ffprobe stream probe",
            source,
        })?;

    if !output.status.success() {
        return Err(MediaFfmpegError::CommandFailed {
            command: command_for_display("ffprobe stream probe", path),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let stdout = String::from_utf8(output.stdout)?;
    let lines: Vec<&str> = stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    if lines.is_empty() {
        return Err(MediaFfmpegError::Parse {
            context: "streams",
            value: "no streams found".to_string(),
        });
    }

    let mut video = None;
    for line in &lines {
        let fields = parse_fields(line)?;
        if fields.get("codec_type").copied() != Some("video") {
            continue;
        }
        video = Some(parse_video_stream(path, line, &fields)?);
        break;
    }

    let duration_seconds = probe_duration_seconds(path)?;
    Ok(MediaInfo {
        path: path.to_path_buf(),
        stream_count: lines.len(),
        video,
        duration_seconds,
    })
}

fn parse_fields(line: &str) -> Result<HashMap<&str, &str>> {
    let mut map = HashMap::new();
    for field in line.split('|') {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| MediaFfmpegError::Parse {
                context: "stream field",
                value: field.to_string(),
            })?;
        map.insert(key.trim(), unquote(value.trim()));
    }
    Ok(map)
}

fn parse_video_stream(
    path: &Path,
    line: &str,
    fields: &HashMap<&str, &str>,
) -> Result<VideoStreamInfo> {
    let index = parse_optional_u32(fields.get("index").copied(), "stream index")?.ok_or_else(
        || MediaFfmpegError::Parse {
            context: "stream index",
            value: line.to_string(),
        },
    )?;
    let time_base = parse_optional_rational(fields.get("time_base").copied(), "time_base")?
        .ok_or_else(|| MediaFfmpegError::Parse {
            context: "time_base",
            value: line.to_string(),
        })?;
    let width = parse_optional_u32(fields.get("width").copied(), "width")?
        .ok_or_else(|| MediaFfmpegError::MissingVideoDimensions(path.to_path_buf()))?;
    let height = parse_optional_u32(fields.get("height").copied(), "height")?
        .ok_or_else(|| MediaFfmpegError::MissingVideoDimensions(path.to_path_buf()))?;

    Ok(VideoStreamInfo {
        index,
        codec_name: fields.get("codec_name").map(|value| value.to_string()),
        time_base,
        width,
        height,
        sample_aspect_ratio: parse_aspect_ratio(fields.get("sample_aspect_ratio").copied()),
        frame_rate: parse_optional_rational(fields.get("r_frame_rate").copied(), "r_frame_rate")?,
        start_pts: parse_optional_i64(fields.get("start_pts").copied(), "start_pts")?,
        duration_ts: parse_optional_i64(fields.get("duration_ts").copied(), "duration_ts")?,
    })
}

fn probe_duration_seconds(path: &Path) -> Result<Option<f64>> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=nokey=1:noprint_wrappers=1",
        ])
        .arg(path)
        .output()
        .map_err(|source| MediaFfmpegError::Io {
            context: "run ffprobe duration probe",
            source,
        })?;

    if !output.status.success() {
        return Err(MediaFfmpegError::CommandFailed {
            command: command_for_display("ffprobe duration probe", path),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let stdout = String::from_utf8(output.stdout)?;
    let value = stdout.trim();
    if value.is_empty() || value == "N/A" {
        return Ok(None);
    }
    let duration = value.parse::<f64>().map_err(|_| MediaFfmpegError::Parse {
        context: "format duration seconds",
        value: value.to_string(),
    })?;
    Ok(Some(duration))
}

// SAR is written as `1:1`; `0:1` means unknown.
fn parse_aspect_ratio(value: Option<&str>) -> Option<Rational> {
    let (num, den) = value?.split_once(':')?;
    Rational::new(num.trim().parse().ok()?, den.trim().parse().ok()?).ok()
}

fn parse_optional_u32(value: Option<&str>, context: &'static str) -> Result<Option<u32>> {
    parse_optional(value, context, str::parse::<u32>)
}

fn parse_optional_i64(value: Option<&str>, context: &'static str) -> Result<Option<i64>> {
    parse_optional(value, context, str::parse::<i64>)
}

fn parse_optional_rational(value: Option<&str>, context: &'static str) -> Result<Option<Rational>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    if raw.is_empty() || raw == "N/A" || raw == "0/0" {
        return Ok(None);
    }

    Rational::parse(raw)
        .map(Some)
        .map_err(|_| MediaFfmpegError::Parse {
            context,
            value: raw.to_string(),
        })
}

fn parse_optional<T, F>(value: Option<&str>, context: &'static str, parse: F) -> Result<Option<T>>
where
    F: Fn(&str) -> std::result::Result<T, std::num::ParseIntError>,
{
    let Some(raw) = value else {
        return Ok(None);
    };
    if raw.is_empty() || raw == "N/A" {
        return Ok(None);
    }

    parse(raw).map(Some).map_err(|_| MediaFfmpegError::Parse {
        context,
        value: raw.to_string(),
    })
}

fn unquote(value: &str) -> &str {
    value.trim_matches('"')
}

fn command_for_display(context: &str, path: &Path) -> String {
    format!("{context}: ffprobe {}", path.display())
}
