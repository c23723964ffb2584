//! Probe result types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Information about a probed video file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Path to the media file.
    pub file_path: PathBuf,
    /// File size in bytes.
    pub file_size: u64,
    /// Container format as reported by ffprobe (e.g., "mpeg", "matroska,webm").
    pub container: String,
    /// Duration in milliseconds (0 when the container does not report one).
    pub duration_ms: u64,
    /// Overall bitrate in kbps.
    pub kbps: Option<u32>,
    /// Primary video stream.
    pub video: Option<VideoStream>,
    /// Primary audio stream.
    pub audio: Option<AudioStream>,
    /// Whether the transcoder can handle this file at all.
    pub supported: bool,
}

/// The primary video stream of a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoStream {
    /// Stream index within the container.
    pub index: u32,
    /// Codec name (e.g., "mpeg2video", "h264").
    pub codec: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate rounded to two decimals (e.g., "29.97").
    pub fps: Option<String>,
    /// Sample (pixel) aspect ratio, e.g. "1:1".
    pub par: Option<String>,
    /// Display aspect ratio, e.g. "16:9".
    pub dar: Option<String>,
    /// Stream bitrate in kbps.
    pub kbps: Option<u32>,
}

/// The primary audio stream of a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioStream {
    /// Stream index within the container.
    pub index: u32,
    /// Codec name (e.g., "ac3", "aac").
    pub codec: String,
    /// Stream bitrate in kbps.
    pub kbps: Option<u32>,
    /// Sample rate in Hz.
    pub sample_rate: Option<u32>,
    /// Number of channels.
    pub channels: Option<u32>,
}

impl VideoInfo {
    pub fn width(&self) -> u32 {
        self.video.as_ref().map(|v| v.width).unwrap_or(0)
    }

    pub fn height(&self) -> u32 {
        self.video.as_ref().map(|v| v.height).unwrap_or(0)
    }

    /// Display aspect ratio as a float, derived from the DAR string or the
    /// frame size corrected by the pixel aspect ratio.
    pub fn aspect(&self) -> Option<f64> {
        let video = self.video.as_ref()?;
        if let Some(dar) = video.dar.as_deref().and_then(parse_ratio) {
            return Some(dar);
        }
        if video.height == 0 {
            return None;
        }
        let par = video.par.as_deref().and_then(parse_ratio).unwrap_or(1.0);
        Some(video.width as f64 / video.height as f64 * par)
    }

    /// Probe fields keyed by their diagnostic names.
    ///
    /// Absent values are left out rather than reported as empty.
    pub fn source_fields(&self) -> BTreeMap<&'static str, String> {
        let mut fields = BTreeMap::new();
        fields.insert("container", self.container.clone());
        fields.insert("millisecs", self.duration_ms.to_string());
        fields.insert("Supported", self.supported.to_string());
        if let Some(kbps) = self.kbps {
            fields.insert("kbps", kbps.to_string());
        }

        if let Some(video) = &self.video {
            fields.insert("vCodec", video.codec.clone());
            fields.insert("vWidth", video.width.to_string());
            fields.insert("vHeight", video.height.to_string());
            fields.insert("mapVideo", format!("0:{}", video.index));
            if let Some(fps) = &video.fps {
                fields.insert("vFps", fps.clone());
            }
            if let Some(par) = &video.par {
                fields.insert("par", par.clone());
            }
            if let Some(dar) = &video.dar {
                fields.insert("dar1", dar.clone());
            }
            if let Some(kbps) = video.kbps {
                fields.insert("vKbps", kbps.to_string());
            }
        }

        if let Some(audio) = &self.audio {
            fields.insert("aCodec", audio.codec.clone());
            fields.insert("mapAudio", format!("0:{}", audio.index));
            if let Some(kbps) = audio.kbps {
                fields.insert("aKbps", kbps.to_string());
            }
            if let Some(freq) = audio.sample_rate {
                fields.insert("aFreq", freq.to_string());
            }
            if let Some(ch) = audio.channels {
                fields.insert("aCh", ch.to_string());
            }
        }

        fields
    }
}

/// Parse "16:9" or "16/9" into 1.777...
pub(crate) fn parse_ratio(s: &str) -> Option<f64> {
    let (num, den) = s.split_once([':', '/'])?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if num == 0.0 || den == 0.0 {
        return None;
    }
    Some(num / den)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> VideoInfo {
        VideoInfo {
            file_path: PathBuf::from("/media/show.mkv"),
            file_size: 1000,
            container: "matroska,webm".to_string(),
            duration_ms: 60_000,
            kbps: Some(4500),
            video: Some(VideoStream {
                index: 0,
                codec: "h264".to_string(),
                width: 1280,
                height: 720,
                fps: Some("29.97".to_string()),
                par: Some("1:1".to_string()),
                dar: Some("16:9".to_string()),
                kbps: None,
            }),
            audio: Some(AudioStream {
                index: 1,
                codec: "aac".to_string(),
                kbps: Some(128),
                sample_rate: Some(48000),
                channels: Some(2),
            }),
            supported: true,
        }
    }

    #[test]
    fn test_source_fields() {
        let fields = sample().source_fields();
        assert_eq!(fields["vCodec"], "h264");
        assert_eq!(fields["vHeight"], "720");
        assert_eq!(fields["mapAudio"], "0:1");
        assert_eq!(fields["millisecs"], "60000");
        assert!(!fields.contains_key("vKbps"));
    }

    #[test]
    fn test_aspect() {
        let info = sample();
        let aspect = info.aspect().unwrap();
        assert!((aspect - 16.0 / 9.0).abs() < 1e-9);

        let mut sd = sample();
        if let Some(v) = sd.video.as_mut() {
            v.width = 720;
            v.height = 480;
            v.dar = None;
            v.par = Some("8:9".to_string());
        }
        let aspect = sd.aspect().unwrap();
        assert!((aspect - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_ratio() {
        assert_eq!(parse_ratio("4:3"), Some(4.0 / 3.0));
        assert_eq!(parse_ratio("30000/1001"), Some(30000.0 / 1001.0));
        assert_eq!(parse_ratio("0:1"), None);
        assert_eq!(parse_ratio("nonsense"), None);
    }
}
