//! Size estimates for files that will be re-encoded.

use crate::error::Result;
use std::path::Path;
use tivoshare_av::{DeviceProfile, Transcoder};

/// Container overhead allowance, in percent of the raw stream size.
const OVERHEAD_PERCENT: u128 = 102;

/// Estimated size in bytes of `path` as sent to the device.
///
/// Device-compatible files are sent unmodified, so their on-disk size is
/// exact. Everything else is estimated from the duration and the audio plus
/// video bitrate, with a 2% allowance for container overhead.
pub fn estimate(transcoder: &dyn Transcoder, path: &Path, profile: &DeviceProfile) -> Result<u64> {
    if transcoder.tivo_compatible(path, profile)?.compatible {
        return Ok(std::fs::metadata(path)?.len());
    }

    let audio_bps = match profile.audio_codec {
        Some(_) => profile.audio_bitrate,
        None => profile.max_audio_bitrate(),
    };
    let video_bps = transcoder.select_video_bitrate(path, profile)?;
    let duration_ms = transcoder.video_info(path)?.duration_ms;

    Ok(stream_bytes(duration_ms, audio_bps + video_bps))
}

/// `floor(duration_ms / 1000 * bits_per_second * 1.02 / 8)` in exact
/// integer arithmetic.
pub fn stream_bytes(duration_ms: u64, bits_per_second: u64) -> u64 {
    let bytes = u128::from(duration_ms) * u128::from(bits_per_second) * OVERHEAD_PERCENT / 800_000;
    u64::try_from(bytes).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;
    use tivoshare_av::{Compatibility, VideoInfo};

    /// Transcoder with a fixed verdict, video bitrate and duration.
    struct StubTranscoder {
        compatible: bool,
        video_bps: u64,
        duration_ms: u64,
    }

    impl Transcoder for StubTranscoder {
        fn video_info(&self, path: &Path) -> tivoshare_av::Result<Arc<VideoInfo>> {
            Ok(Arc::new(VideoInfo {
                file_path: path.to_path_buf(),
                duration_ms: self.duration_ms,
                supported: true,
                ..Default::default()
            }))
        }

        fn tivo_compatible(
            &self,
            _path: &Path,
            _profile: &DeviceProfile,
        ) -> tivoshare_av::Result<Compatibility> {
            Ok(Compatibility {
                compatible: self.compatible,
                reason: String::new(),
            })
        }

        fn select_video_bitrate(
            &self,
            _path: &Path,
            _profile: &DeviceProfile,
        ) -> tivoshare_av::Result<u64> {
            Ok(self.video_bps)
        }
    }

    fn stub(compatible: bool) -> StubTranscoder {
        StubTranscoder {
            compatible,
            video_bps: 4_096_000,
            duration_ms: 60_000,
        }
    }

    #[test]
    fn test_compatible_file_uses_size_on_disk_for_any_device() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("show.mpg");
        fs::write(&file, vec![0u8; 4321]).unwrap();

        let sd = DeviceProfile::default();
        let hd = DeviceProfile {
            width: 1440,
            height: 720,
            audio_codec: Some("ac3".to_string()),
            audio_bitrate: 384_000,
            video_bitrate: 8_000_000,
            ..Default::default()
        };

        let transcoder = stub(true);
        assert_eq!(estimate(&transcoder, &file, &sd).unwrap(), 4321);
        assert_eq!(estimate(&transcoder, &file, &hd).unwrap(), 4321);
    }

    #[test]
    fn test_without_audio_codec_uses_max_audio_bitrate() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("movie.mkv");
        fs::write(&file, b"data").unwrap();

        let profile = DeviceProfile {
            audio_codec: None,
            audio_bitrate: 192_000,
            max_audio_bitrate_kbps: 448,
            ..Default::default()
        };
        // floor(60 * (448_000 + 4_096_000) * 1.02 / 8)
        assert_eq!(
            estimate(&stub(false), &file, &profile).unwrap(),
            34_761_600
        );
    }

    #[test]
    fn test_fixed_audio_codec_uses_configured_bitrate() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("movie.mkv");
        fs::write(&file, b"data").unwrap();

        let profile = DeviceProfile {
            audio_codec: Some("ac3".to_string()),
            audio_bitrate: 192_000,
            max_audio_bitrate_kbps: 448,
            ..Default::default()
        };
        assert_eq!(
            estimate(&stub(false), &file, &profile).unwrap(),
            32_803_200
        );
    }

    #[test]
    fn test_stream_bytes() {
        assert_eq!(stream_bytes(60_000, 192_000 + 4_096_000), 32_803_200);
        assert_eq!(stream_bytes(0, 4_096_000), 0);
        // Fractional seconds count.
        assert_eq!(stream_bytes(1_500, 8_000), 1_530);
    }
}
