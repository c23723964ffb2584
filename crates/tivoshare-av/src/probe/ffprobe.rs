//! FFprobe-based video probing.

use super::types::*;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: String,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    sample_aspect_ratio: Option<String>,
    display_aspect_ratio: Option<String>,
    bit_rate: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
}

/// Probe a video file using the given ffprobe executable.
pub fn probe_with_ffprobe(ffprobe: &Path, path: &Path) -> Result<VideoInfo> {
    if !path.exists() {
        return Err(Error::file_not_found(path));
    }

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("ffprobe")
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed("ffprobe", stderr.to_string()));
    }

    let json_str = String::from_utf8(output.stdout)
        .map_err(|e| Error::parse_error("ffprobe", format!("Invalid UTF-8: {}", e)))?;

    parse_ffprobe_json(path, &json_str)
}

/// Parse an ffprobe JSON report for `path`.
pub(crate) fn parse_ffprobe_json(path: &Path, json: &str) -> Result<VideoInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)?;
    Ok(parse_ffprobe_output(path, output))
}

fn parse_ffprobe_output(path: &Path, output: FfprobeOutput) -> VideoInfo {
    let duration_ms = output
        .format
        .duration
        .and_then(|s| s.parse::<f64>().ok())
        .map(|secs| (secs * 1000.0).round() as u64)
        .unwrap_or(0);

    let mut info = VideoInfo {
        file_path: path.to_path_buf(),
        file_size: output.format.size.and_then(|s| s.parse().ok()).unwrap_or(0),
        container: output.format.format_name,
        duration_ms,
        kbps: output.format.bit_rate.as_deref().and_then(parse_kbps),
        video: None,
        audio: None,
        supported: false,
    };

    // Only the first stream of each kind is considered.
    for stream in output.streams {
        match stream.codec_type.as_deref() {
            Some("video") if info.video.is_none() => {
                info.video = Some(VideoStream {
                    index: stream.index,
                    codec: stream.codec_name.unwrap_or_default(),
                    width: stream.width.unwrap_or(0),
                    height: stream.height.unwrap_or(0),
                    fps: stream.r_frame_rate.as_deref().and_then(format_frame_rate),
                    par: stream.sample_aspect_ratio.filter(|r| r != "0:1"),
                    dar: stream.display_aspect_ratio.filter(|r| r != "0:1"),
                    kbps: stream.bit_rate.as_deref().and_then(parse_kbps),
                });
            }
            Some("audio") if info.audio.is_none() => {
                info.audio = Some(AudioStream {
                    index: stream.index,
                    codec: stream.codec_name.unwrap_or_default(),
                    kbps: stream.bit_rate.as_deref().and_then(parse_kbps),
                    sample_rate: stream.sample_rate.and_then(|s| s.parse().ok()),
                    channels: stream.channels,
                });
            }
            _ => {}
        }
    }

    info.supported = info.video.is_some();
    info
}

fn parse_kbps(bits: &str) -> Option<u32> {
    bits.parse::<u64>().ok().map(|b| (b / 1000) as u32)
}

fn format_frame_rate(rate_str: &str) -> Option<String> {
    let rate = match rate_str.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate_str.parse().ok()?,
    };
    Some(format!("{:.2}", rate))
}
