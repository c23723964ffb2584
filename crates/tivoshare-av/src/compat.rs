//! Decide whether a file can be sent to a TiVo without re-encoding.

use crate::probe::VideoInfo;
use crate::profile::{DeviceProfile, COMPATIBLE_AUDIO_CODECS};
use std::path::Path;
use tivoshare_common::paths::is_native_recording;

/// Containers a TiVo accepts as an MPEG-2 program stream.
const COMPATIBLE_CONTAINERS: &[&str] = &["mpeg", "vob"];

/// Outcome of a compatibility check with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compatibility {
    pub compatible: bool,
    pub reason: String,
}

impl Compatibility {
    fn yes(reason: &str) -> Self {
        Self {
            compatible: true,
            reason: format!("TRANSCODE=NO, {reason}"),
        }
    }

    fn no(field: &str, value: impl std::fmt::Display) -> Self {
        Self {
            compatible: false,
            reason: format!("TRANSCODE=YES, {field} {value} not compatible"),
        }
    }
}

impl std::fmt::Display for Compatibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Check a probed file against a device profile.
///
/// Rules are evaluated in order and the first failing rule supplies the
/// reason.
pub fn check(path: &Path, info: &VideoInfo, profile: &DeviceProfile) -> Compatibility {
    if is_native_recording(path) {
        return Compatibility::yes("tivo file");
    }

    if !info.supported {
        return Compatibility::no("format", "unsupported");
    }

    let container_ok = info
        .container
        .split(',')
        .any(|c| COMPATIBLE_CONTAINERS.contains(&c));
    if !container_ok {
        return Compatibility::no("container", &info.container);
    }

    // `supported` guarantees a video stream.
    let Some(video) = info.video.as_ref() else {
        return Compatibility::no("vCodec", "none");
    };
    if video.codec != "mpeg2video" {
        return Compatibility::no("vCodec", &video.codec);
    }
    if !profile.accepts_width(video.width) {
        return Compatibility::no("vWidth", video.width);
    }
    if !profile.accepts_height(video.height) {
        return Compatibility::no("vHeight", video.height);
    }

    let fps = video.fps.as_deref().unwrap_or("unknown");
    let fps_ok = fps == "29.97" || (video.height == 720 && fps == "59.94");
    if !fps_ok {
        return Compatibility::no("vFps", fps);
    }

    if let Some(audio) = info.audio.as_ref() {
        if !COMPATIBLE_AUDIO_CODECS.contains(&audio.codec.as_str()) {
            return Compatibility::no("aCodec", &audio.codec);
        }
        if let Some(kbps) = audio.kbps {
            if kbps > profile.max_audio_bitrate_kbps {
                return Compatibility::no("aKbps", kbps);
            }
        }
    }

    if let Some(kbps) = info.kbps {
        if u64::from(kbps) * 1000 > profile.max_video_bitrate {
            return Compatibility::no("kbps", kbps);
        }
    }

    Compatibility::yes("all compatible")
}
