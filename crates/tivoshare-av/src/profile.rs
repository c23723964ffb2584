//! Per-device encoding targets.

use serde::{Deserialize, Serialize};
use tivoshare_common::Tsn;

/// Frame widths a TiVo accepts for MPEG-2 program streams.
pub const VALID_WIDTHS: &[u32] = &[1440, 720, 704, 544, 480, 352];

/// Frame heights a TiVo accepts. 240 also works but is never targeted.
pub const VALID_HEIGHTS: &[u32] = &[720, 480];

/// Audio codecs a TiVo plays without re-encoding.
pub const COMPATIBLE_AUDIO_CODECS: &[&str] = &["ac3", "mp2"];

/// Encoding targets resolved for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Device the profile was resolved for.
    pub tsn: Tsn,
    /// Target frame width.
    pub width: u32,
    /// Target frame height.
    pub height: u32,
    /// Whether the device displays 16:9 material.
    pub aspect169: bool,
    /// Target audio bitrate in bits per second.
    pub audio_bitrate: u64,
    /// Fixed audio codec, if one is configured.
    pub audio_codec: Option<String>,
    /// Highest audio bitrate the device accepts, in kbps.
    pub max_audio_bitrate_kbps: u32,
    /// Target video bitrate in bits per second.
    pub video_bitrate: u64,
    /// Highest video bitrate the device accepts, in bits per second.
    pub max_video_bitrate: u64,
    /// ffmpeg `-bufsize` value.
    pub buffer_size: String,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            tsn: Tsn::unknown(),
            width: 544,
            height: 480,
            aspect169: true,
            audio_bitrate: 192_000,
            audio_codec: None,
            max_audio_bitrate_kbps: 448,
            video_bitrate: 4_096_000,
            max_video_bitrate: 17_408_000,
            buffer_size: "1024k".to_string(),
        }
    }
}

impl DeviceProfile {
    /// Whether the target frame size is high definition.
    pub fn is_hd(&self) -> bool {
        self.height >= 720 || self.width >= 1280
    }

    /// Highest audio bitrate the device accepts, in bits per second.
    pub fn max_audio_bitrate(&self) -> u64 {
        u64::from(self.max_audio_bitrate_kbps) * 1000
    }

    pub fn accepts_width(&self, width: u32) -> bool {
        VALID_WIDTHS.contains(&width) || (self.is_hd() && width == 1280)
    }

    pub fn accepts_height(&self, height: u32) -> bool {
        VALID_HEIGHTS.contains(&height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_sd() {
        let profile = DeviceProfile::default();
        assert!(!profile.is_hd());
        assert_eq!(profile.max_audio_bitrate(), 448_000);
        assert!(profile.accepts_width(544));
        assert!(!profile.accepts_width(1280));
    }

    #[test]
    fn test_hd_accepts_1280() {
        let profile = DeviceProfile {
            width: 1440,
            height: 720,
            ..Default::default()
        };
        assert!(profile.is_hd());
        assert!(profile.accepts_width(1280));
        assert!(profile.accepts_height(720));
        assert!(!profile.accepts_height(1080));
    }
}
