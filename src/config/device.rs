//! Per-device lookups over the loaded configuration.
//!
//! Every lookup takes the requesting device's serial; a `[tivos.<tsn>]`
//! override wins over the `[server]` value, which wins over the built-in
//! default.

use super::{Config, ShareConfig, TivoConfig};
use tivoshare_av::profile::{VALID_HEIGHTS, VALID_WIDTHS};
use tivoshare_av::DeviceProfile;
use tivoshare_common::Tsn;

/// Model prefixes of receivers that cannot display 16:9 material.
const NON_WIDESCREEN_MODELS: &[&str] = &["540", "649"];

const DEFAULT_WIDTH: u32 = 544;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_AUDIO_BITRATE: u64 = 192_000;
const DEFAULT_VIDEO_BITRATE: u64 = 4_096_000;
const DEFAULT_MAX_VIDEO_BITRATE: u64 = 17_408_000;

/// Parse a bitrate such as `"192K"`, `"4M"` or `"1Mi"` into bits per second.
///
/// `K`/`M` are decimal multipliers, `Ki`/`Mi` binary ones, and a bare number
/// is taken as bits per second. Returns `None` for anything else.
pub fn parse_bitrate(value: &str) -> Option<u64> {
    let value = value.trim();
    let lower = value.to_ascii_lowercase();

    let (number, multiplier) = if let Some(n) = lower.strip_suffix("mi") {
        (n, 1_048_576.0)
    } else if let Some(n) = lower.strip_suffix("ki") {
        (n, 1024.0)
    } else if let Some(n) = lower.strip_suffix('m') {
        (n, 1_000_000.0)
    } else if let Some(n) = lower.strip_suffix('k') {
        (n, 1000.0)
    } else {
        (lower.as_str(), 1.0)
    };

    let number: f64 = number.trim().parse().ok()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    Some((number * multiplier).round() as u64)
}

/// The value in `candidates` closest to `value`; ties go to the larger one.
pub fn nearest(value: u32, candidates: &[u32]) -> u32 {
    candidates
        .iter()
        .copied()
        .min_by(|&a, &b| {
            let da = a.abs_diff(value);
            let db = b.abs_diff(value);
            da.cmp(&db).then(b.cmp(&a))
        })
        .unwrap_or(value)
}

impl Config {
    fn tivo(&self, tsn: &Tsn) -> Option<&TivoConfig> {
        if tsn.is_unknown() {
            return None;
        }
        self.tivos.get(tsn.as_str())
    }

    pub fn guid(&self) -> &str {
        &self.server.guid
    }

    pub fn port(&self) -> u16 {
        self.server.port
    }

    pub fn share(&self, name: &str) -> Option<&ShareConfig> {
        self.shares.get(name)
    }

    pub fn shares(&self) -> impl Iterator<Item = (&str, &ShareConfig)> {
        self.shares.iter().map(|(name, share)| (name.as_str(), share))
    }

    /// Normalized static extension allow-list, if one is configured.
    pub fn video_extensions(&self) -> Option<Vec<String>> {
        self.video.extensions.as_ref().map(|exts| {
            exts.iter()
                .map(|e| tivoshare_common::paths::normalize_extension(e))
                .collect()
        })
    }

    /// Whether the device displays 16:9 material.
    pub fn aspect169(&self, tsn: &Tsn) -> bool {
        if tsn.is_unknown() {
            return true;
        }
        if let Some(setting) = self.tivo(tsn).and_then(|t| t.aspect169) {
            return setting;
        }
        !NON_WIDESCREEN_MODELS.contains(&tsn.model_prefix(3))
    }

    pub fn tivo_width(&self, tsn: &Tsn) -> u32 {
        self.tivo(tsn)
            .and_then(|t| t.width)
            .or(self.server.width)
            .map(|w| nearest(w, VALID_WIDTHS))
            .unwrap_or(DEFAULT_WIDTH)
    }

    pub fn tivo_height(&self, tsn: &Tsn) -> u32 {
        self.tivo(tsn)
            .and_then(|t| t.height)
            .or(self.server.height)
            .map(|h| nearest(h, VALID_HEIGHTS))
            .unwrap_or(DEFAULT_HEIGHT)
    }

    /// Whether the device is configured for a high-definition frame size.
    pub fn is_hd_target(&self, tsn: &Tsn) -> bool {
        self.tivo_height(tsn) >= 720 || self.tivo_width(tsn) >= 1280
    }

    /// Audio bitrate in bits per second.
    pub fn audio_bitrate(&self, tsn: &Tsn) -> u64 {
        let value = self
            .tivo(tsn)
            .and_then(|t| t.audio_br.as_deref())
            .unwrap_or(&self.server.audio_br);
        parse_bitrate(value).unwrap_or(DEFAULT_AUDIO_BITRATE)
    }

    /// Video bitrate in bits per second.
    pub fn video_bitrate(&self, tsn: &Tsn) -> u64 {
        let value = self
            .tivo(tsn)
            .and_then(|t| t.video_br.as_deref())
            .unwrap_or(&self.server.video_br);
        parse_bitrate(value).unwrap_or(DEFAULT_VIDEO_BITRATE)
    }

    /// Highest audio bitrate in kbps.
    pub fn max_audio_bitrate(&self, tsn: &Tsn) -> u32 {
        self.tivo(tsn)
            .and_then(|t| t.max_audio_br)
            .unwrap_or(self.server.max_audio_br)
    }

    /// Highest video bitrate in bits per second.
    pub fn max_video_bitrate(&self) -> u64 {
        parse_bitrate(&self.server.max_video_br).unwrap_or(DEFAULT_MAX_VIDEO_BITRATE)
    }

    pub fn audio_codec(&self, tsn: &Tsn) -> Option<String> {
        self.tivo(tsn)
            .and_then(|t| t.audio_codec.clone())
            .or_else(|| self.server.audio_codec.clone())
    }

    /// Encoding targets handed to the transcoder for one device.
    pub fn profile_for(&self, tsn: &Tsn) -> DeviceProfile {
        DeviceProfile {
            tsn: tsn.clone(),
            width: self.tivo_width(tsn),
            height: self.tivo_height(tsn),
            aspect169: self.aspect169(tsn),
            audio_bitrate: self.audio_bitrate(tsn),
            audio_codec: self.audio_codec(tsn),
            max_audio_bitrate_kbps: self.max_audio_bitrate(tsn),
            video_bitrate: self.video_bitrate(tsn),
            max_video_bitrate: self.max_video_bitrate(),
            buffer_size: self.server.buffer_size.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_tivo(tsn: &str, tivo: TivoConfig) -> Config {
        let mut config = Config::default();
        config.tivos.insert(tsn.to_string(), tivo);
        config
    }

    #[test]
    fn test_parse_bitrate() {
        assert_eq!(parse_bitrate("192K"), Some(192_000));
        assert_eq!(parse_bitrate("4096k"), Some(4_096_000));
        assert_eq!(parse_bitrate("4M"), Some(4_000_000));
        assert_eq!(parse_bitrate("1Mi"), Some(1_048_576));
        assert_eq!(parse_bitrate("2Ki"), Some(2048));
        assert_eq!(parse_bitrate("128000"), Some(128_000));
        assert_eq!(parse_bitrate("1.5M"), Some(1_500_000));
        assert_eq!(parse_bitrate("fast"), None);
        assert_eq!(parse_bitrate("-1K"), None);
    }

    #[test]
    fn test_nearest_prefers_larger_on_tie() {
        assert_eq!(nearest(600, VALID_WIDTHS), 544);
        assert_eq!(nearest(1920, VALID_WIDTHS), 1440);
        assert_eq!(nearest(600, VALID_HEIGHTS), 720);
        assert_eq!(nearest(416, &[352, 480]), 480);
    }

    #[test]
    fn test_aspect169() {
        let config = Config::default();
        assert!(config.aspect169(&Tsn::unknown()));
        assert!(!config.aspect169(&Tsn::from("5400001802C0F2A")));
        assert!(!config.aspect169(&Tsn::from("6490001802C0F2A")));
        assert!(config.aspect169(&Tsn::from("6520001802C0F2A")));

        let config = config_with_tivo(
            "5400001802C0F2A",
            TivoConfig {
                aspect169: Some(true),
                ..Default::default()
            },
        );
        assert!(config.aspect169(&Tsn::from("5400001802C0F2A")));
    }

    #[test]
    fn test_frame_size_defaults_and_overrides() {
        let mut config = Config::default();
        let tsn = Tsn::from("6520001802C0F2A");
        assert_eq!(config.tivo_width(&tsn), 544);
        assert_eq!(config.tivo_height(&tsn), 480);
        assert!(!config.is_hd_target(&tsn));

        config.server.width = Some(1920);
        config.server.height = Some(1080);
        assert_eq!(config.tivo_width(&tsn), 1440);
        assert_eq!(config.tivo_height(&tsn), 720);
        assert!(config.is_hd_target(&tsn));

        config.tivos.insert(
            tsn.to_string(),
            TivoConfig {
                width: Some(720),
                height: Some(480),
                ..Default::default()
            },
        );
        assert_eq!(config.tivo_width(&tsn), 720);
        assert!(!config.is_hd_target(&tsn));
    }

    #[test]
    fn test_profile_for() {
        let config = config_with_tivo(
            "746",
            TivoConfig {
                audio_br: Some("384K".to_string()),
                audio_codec: Some("ac3".to_string()),
                ..Default::default()
            },
        );
        let profile = config.profile_for(&Tsn::from("746"));
        assert_eq!(profile.audio_bitrate, 384_000);
        assert_eq!(profile.audio_codec.as_deref(), Some("ac3"));
        assert_eq!(profile.video_bitrate, 4_096_000);
        assert_eq!(profile.max_video_bitrate, 17_408_000);
        assert_eq!(profile.max_audio_bitrate_kbps, 448);

        let default = config.profile_for(&Tsn::unknown());
        assert_eq!(default.audio_bitrate, 192_000);
        assert_eq!(default.audio_codec, None);
    }
}
