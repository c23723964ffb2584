//! Transcode planning and ffmpeg process handling.
//!
//! A [`TranscodePlan`] is the ordered list of ffmpeg options that turns a
//! source file into an MPEG-2 program stream a TiVo accepts. Planning is pure;
//! [`spawn_transcode`] and [`stream_video`] run it.

use crate::compat::Compatibility;
use crate::probe::VideoInfo;
use crate::profile::{DeviceProfile, COMPATIBLE_AUDIO_CODECS};
use crate::{Error, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};

/// Lowest video bitrate ever selected, in bits per second.
const MIN_VIDEO_BITRATE: u64 = 1_000_000;

/// Audio sample rate of the output stream.
const OUTPUT_SAMPLE_RATE: &str = "48000";

/// Ordered ffmpeg options for one transcode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscodePlan {
    options: Vec<(String, String)>,
}

impl TranscodePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, option: impl Into<String>, value: impl Into<String>) {
        self.options.push((option.into(), value.into()));
    }

    pub fn options(&self) -> &[(String, String)] {
        &self.options
    }

    /// Option values in plan order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|(_, v)| v.as_str())
    }

    /// Value of the first occurrence of an option.
    pub fn get(&self, option: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(o, _)| o == option)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Full ffmpeg argument list reading `input` and writing to stdout.
    pub fn args(&self, input: &Path) -> Vec<String> {
        let mut args = vec!["-i".to_string(), input.display().to_string()];
        for (option, value) in &self.options {
            args.push(option.clone());
            args.push(value.clone());
        }
        args.push("-".to_string());
        args
    }
}

/// Pick the video bitrate for transcoding `info` to `profile`.
///
/// The configured bitrate capped at the device maximum, lowered to the
/// source's own video bitrate when that is smaller (never below 1 Mbps).
pub fn select_video_bitrate(info: &VideoInfo, profile: &DeviceProfile) -> u64 {
    let target = profile.video_bitrate.min(profile.max_video_bitrate);
    let source = info
        .video
        .as_ref()
        .and_then(|v| v.kbps)
        .or(info.kbps)
        .map(|kbps| u64::from(kbps) * 1000);

    match source {
        Some(bps) if bps < target => bps.max(MIN_VIDEO_BITRATE),
        _ => target,
    }
}

/// Plan the ffmpeg options for transcoding `info` to `profile`.
pub fn plan(info: &VideoInfo, profile: &DeviceProfile) -> Result<TranscodePlan> {
    let video = info
        .video
        .as_ref()
        .ok_or_else(|| Error::Unsupported(format!("no video stream in {}", info.file_path.display())))?;

    let mut plan = TranscodePlan::new();

    let video_copy = video.codec == "mpeg2video"
        && profile.accepts_width(video.width)
        && profile.accepts_height(video.height)
        && video.fps.as_deref() == Some("29.97");

    if video_copy {
        plan.push("-vcodec", "copy");
    } else {
        let kbps = select_video_bitrate(info, profile) / 1000;
        let aspect = match info.aspect() {
            Some(a) if profile.aspect169 && a >= 1.5 => "16:9",
            _ => "4:3",
        };
        plan.push("-vcodec", "mpeg2video");
        plan.push("-b", format!("{kbps}k"));
        plan.push("-maxrate", format!("{}k", profile.max_video_bitrate / 1000));
        plan.push("-bufsize", profile.buffer_size.clone());
        plan.push("-s", format!("{}x{}", profile.width, profile.height));
        plan.push("-aspect", aspect);
        plan.push("-r", "29.97");
    }

    let audio_copy = info.audio.as_ref().is_some_and(|a| {
        COMPATIBLE_AUDIO_CODECS.contains(&a.codec.as_str())
            && a.kbps.is_some_and(|k| k <= profile.max_audio_bitrate_kbps)
            && profile.audio_codec.as_deref().map_or(true, |c| c == a.codec)
    });

    if audio_copy {
        plan.push("-acodec", "copy");
    } else {
        let codec = profile.audio_codec.clone().unwrap_or_else(|| "ac3".to_string());
        plan.push("-acodec", codec);
        plan.push("-ab", format!("{}k", profile.audio_bitrate / 1000));
        plan.push("-ar", OUTPUT_SAMPLE_RATE);
    }

    plan.push("-map", format!("0:{}", video.index));
    if let Some(audio) = &info.audio {
        plan.push("-map", format!("0:{}", audio.index));
    }
    plan.push("-f", "vob");

    Ok(plan)
}

/// Start ffmpeg for `plan`, with the program stream on the child's stdout.
pub fn spawn_transcode(ffmpeg: &Path, input: &Path, plan: &TranscodePlan) -> Result<Child> {
    #[cfg(feature = "tracing")]
    tracing::debug!(input = %input.display(), args = ?plan.args(input), "Spawning ffmpeg");

    Command::new(ffmpeg)
        .args(plan.args(input))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("ffmpeg")
            } else {
                Error::Io(e)
            }
        })
}

/// Write the device-ready stream for `input` to `out`.
///
/// Compatible files are copied verbatim; everything else is piped through
/// ffmpeg. Returns the number of bytes written.
pub async fn stream_video<W>(
    ffmpeg: &Path,
    input: &Path,
    verdict: &Compatibility,
    plan: &TranscodePlan,
    out: &mut W,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    if verdict.compatible {
        let mut file = tokio::fs::File::open(input).await?;
        return copy(&mut file, out).await;
    }

    let mut child = spawn_transcode(ffmpeg, input, plan)?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| Error::tool_failed("ffmpeg", "stdout not captured"))?;
    let written = copy(&mut stdout, out).await?;

    let status = child.wait().await?;
    if !status.success() {
        return Err(Error::tool_failed("ffmpeg", format!("exited with {status}")));
    }
    Ok(written)
}

async fn copy<R, W>(reader: &mut R, writer: &mut W) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let written = tokio::io::copy(reader, writer).await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{AudioStream, VideoStream};
    use std::path::PathBuf;

    fn h264_source(video_kbps: Option<u32>) -> VideoInfo {
        VideoInfo {
            file_path: PathBuf::from("/m/x.mkv"),
            container: "matroska,webm".to_string(),
            duration_ms: 60_000,
            video: Some(VideoStream {
                index: 0,
                codec: "h264".to_string(),
                width: 1280,
                height: 720,
                fps: Some("23.98".to_string()),
                dar: Some("16:9".to_string()),
                kbps: video_kbps,
                ..Default::default()
            }),
            audio: Some(AudioStream {
                index: 1,
                codec: "aac".to_string(),
                kbps: Some(128),
                ..Default::default()
            }),
            supported: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_select_video_bitrate() {
        let profile = DeviceProfile::default();
        assert_eq!(select_video_bitrate(&h264_source(None), &profile), 4_096_000);
        assert_eq!(select_video_bitrate(&h264_source(Some(8000)), &profile), 4_096_000);
        assert_eq!(select_video_bitrate(&h264_source(Some(2500)), &profile), 2_500_000);
        assert_eq!(select_video_bitrate(&h264_source(Some(300)), &profile), 1_000_000);

        let capped = DeviceProfile {
            video_bitrate: 30_000_000,
            ..Default::default()
        };
        assert_eq!(select_video_bitrate(&h264_source(None), &capped), 17_408_000);
    }

    #[test]
    fn test_plan_for_h264() {
        let plan = plan(&h264_source(None), &DeviceProfile::default()).unwrap();
        assert_eq!(plan.get("-vcodec"), Some("mpeg2video"));
        assert_eq!(plan.get("-b"), Some("4096k"));
        assert_eq!(plan.get("-s"), Some("544x480"));
        assert_eq!(plan.get("-aspect"), Some("16:9"));
        assert_eq!(plan.get("-acodec"), Some("ac3"));
        assert_eq!(plan.get("-ab"), Some("192k"));
        assert_eq!(plan.get("-f"), Some("vob"));
        assert_eq!(plan.values().filter(|v| v.starts_with("0:")).count(), 2);
    }

    #[test]
    fn test_plan_copies_compatible_streams() {
        let mut info = h264_source(None);
        info.video = Some(VideoStream {
            index: 0,
            codec: "mpeg2video".to_string(),
            width: 720,
            height: 480,
            fps: Some("29.97".to_string()),
            ..Default::default()
        });
        info.audio = Some(AudioStream {
            index: 1,
            codec: "ac3".to_string(),
            kbps: Some(384),
            ..Default::default()
        });
        let plan = plan(&info, &DeviceProfile::default()).unwrap();
        assert_eq!(plan.get("-vcodec"), Some("copy"));
        assert_eq!(plan.get("-acodec"), Some("copy"));
        assert_eq!(plan.get("-b"), None);
    }

    #[test]
    fn test_plan_without_video_fails() {
        let info = VideoInfo::default();
        assert!(matches!(
            plan(&info, &DeviceProfile::default()),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_plan_args() {
        let mut plan = TranscodePlan::new();
        plan.push("-vcodec", "copy");
        let args = plan.args(Path::new("/m/x.mpg"));
        assert_eq!(args, vec!["-i", "/m/x.mpg", "-vcodec", "copy", "-"]);
    }

    #[tokio::test]
    async fn test_stream_compatible_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("x.mpg");
        std::fs::write(&input, b"program stream").unwrap();

        let verdict = Compatibility {
            compatible: true,
            reason: "TRANSCODE=NO, all compatible".to_string(),
        };
        let mut out = Vec::new();
        let written = stream_video(
            Path::new("ffmpeg"),
            &input,
            &verdict,
            &TranscodePlan::new(),
            &mut out,
        )
        .await
        .unwrap();
        assert_eq!(written, 14);
        assert_eq!(out, b"program stream");
    }

    #[tokio::test]
    async fn test_spawn_missing_ffmpeg() {
        let result = spawn_transcode(
            Path::new("nonexistent_ffmpeg_12345"),
            Path::new("/m/x.mkv"),
            &TranscodePlan::new(),
        );
        assert!(matches!(result, Err(Error::ToolNotFound { .. })));
    }
}
