//! The transcoding collaborator consumed by the video share.

use crate::cache::InfoCache;
use crate::compat::{self, Compatibility};
use crate::probe::{probe_with_ffprobe, VideoInfo};
use crate::profile::DeviceProfile;
use crate::transcode::{self, TranscodePlan};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tivoshare_common::paths::is_native_recording;

/// Probing and transcode decisions for one file and device.
///
/// Only [`video_info`](Transcoder::video_info) must be provided; the other
/// decisions are derived from the probe result.
pub trait Transcoder: Send + Sync {
    /// Probe a file, possibly from cache.
    fn video_info(&self, path: &Path) -> Result<Arc<VideoInfo>>;

    /// Whether the file holds a stream the transcoder can work with.
    ///
    /// Probe failures count as unsupported.
    fn supported_format(&self, path: &Path) -> bool {
        match self.video_info(path) {
            Ok(info) => info.supported,
            Err(_) => false,
        }
    }

    /// Whether the file can be sent to the device without re-encoding.
    fn tivo_compatible(&self, path: &Path, profile: &DeviceProfile) -> Result<Compatibility> {
        if is_native_recording(path) {
            return Ok(compat::check(path, &VideoInfo::default(), profile));
        }
        let info = self.video_info(path)?;
        Ok(compat::check(path, &info, profile))
    }

    /// Video bitrate in bits per second used when re-encoding for the device.
    fn select_video_bitrate(&self, path: &Path, profile: &DeviceProfile) -> Result<u64> {
        let info = self.video_info(path)?;
        Ok(transcode::select_video_bitrate(&info, profile))
    }

    /// The ffmpeg options that would re-encode the file for the device.
    fn transcode_options(&self, path: &Path, profile: &DeviceProfile) -> Result<TranscodePlan> {
        let info = self.video_info(path)?;
        transcode::plan(&info, profile)
    }
}

/// [`Transcoder`] backed by ffprobe, ffmpeg and a shared [`InfoCache`].
pub struct FfmpegTranscoder {
    cache: Arc<InfoCache>,
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
}

impl FfmpegTranscoder {
    /// Use `ffprobe` and `ffmpeg` from `PATH`.
    pub fn new(cache: Arc<InfoCache>) -> Self {
        Self::with_tools(cache, "ffprobe", "ffmpeg")
    }

    pub fn with_tools(
        cache: Arc<InfoCache>,
        ffprobe: impl Into<PathBuf>,
        ffmpeg: impl Into<PathBuf>,
    ) -> Self {
        Self {
            cache,
            ffprobe: ffprobe.into(),
            ffmpeg: ffmpeg.into(),
        }
    }

    pub fn cache(&self) -> &Arc<InfoCache> {
        &self.cache
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe(&self) -> &Path {
        &self.ffprobe
    }
}

impl Transcoder for FfmpegTranscoder {
    fn video_info(&self, path: &Path) -> Result<Arc<VideoInfo>> {
        self.cache.get_or_try_insert(path, |p| {
            #[cfg(feature = "tracing")]
            tracing::debug!(path = %p.display(), "Probing");
            probe_with_ffprobe(&self.ffprobe, p)
        })
    }
}
