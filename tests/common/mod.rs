//! Shared test harness for integration tests.
//!
//! Provides [`TestShare`], which creates a temporary "Movies" share, a
//! [`Config`] pointing at it and a [`VideoShare`] wired to a scripted
//! [`FakeTranscoder`] and a [`RecordingMind`].

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::ThreadId;
use tempfile::TempDir;
use tivoshare::config::{Config, ShareConfig, TivoConfig};
use tivoshare::devices::DeviceRegistry;
use tivoshare::mind::{Mind, PushRequest};
use tivoshare::pager::DirectoryPager;
use tivoshare::VideoShare;
use tivoshare_av::{AudioStream, ProbeCache, Transcoder, VideoInfo, VideoStream};

pub const SHARE: &str = "Movies";
pub const HD_TSN: &str = "6520001802C0F2A";

/// Transcoder with scripted probe results and a call counter.
///
/// Successful probes are remembered and reported through [`ProbeCache`],
/// the way the production cache behaves.
#[derive(Default)]
pub struct FakeTranscoder {
    scripted: Mutex<HashMap<PathBuf, VideoInfo>>,
    cached: Mutex<HashSet<PathBuf>>,
    probes: AtomicUsize,
    probed: Mutex<Vec<(PathBuf, ThreadId)>>,
}

impl FakeTranscoder {
    pub fn script(&self, path: &Path, info: VideoInfo) {
        self.scripted.lock().insert(path.to_path_buf(), info);
    }

    /// Mark a file as already probed.
    pub fn mark_cached(&self, path: &Path) {
        self.cached.lock().insert(path.to_path_buf());
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Probed paths, in call order.
    pub fn probed_paths(&self) -> Vec<PathBuf> {
        self.probed.lock().iter().map(|(path, _)| path.clone()).collect()
    }

    /// Threads the probes ran on, in call order.
    pub fn probe_threads(&self) -> Vec<ThreadId> {
        self.probed.lock().iter().map(|(_, thread)| *thread).collect()
    }
}

impl Transcoder for FakeTranscoder {
    fn video_info(&self, path: &Path) -> tivoshare_av::Result<Arc<VideoInfo>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.probed
            .lock()
            .push((path.to_path_buf(), std::thread::current().id()));
        let info = self
            .scripted
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| tivoshare_av::Error::tool_failed("ffprobe", "Invalid data found"))?;
        self.cached.lock().insert(path.to_path_buf());
        Ok(Arc::new(info))
    }
}

impl ProbeCache for FakeTranscoder {
    fn has_cached_probe(&self, path: &Path) -> bool {
        self.cached.lock().contains(path)
    }
}

/// Mind that records requests instead of sending them.
#[derive(Default)]
pub struct RecordingMind {
    pub requests: Mutex<Vec<PushRequest>>,
    pub fail: bool,
}

impl RecordingMind {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<PushRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl Mind for RecordingMind {
    async fn push_video(&self, request: &PushRequest) -> anyhow::Result<()> {
        if self.fail {
            return Err(anyhow::anyhow!("connection refused").context("Failed to log in to mind"));
        }
        self.requests.lock().push(request.clone());
        Ok(())
    }
}

/// A one-minute 1080p H.264 file that needs transcoding.
pub fn h264_info(path: &Path) -> VideoInfo {
    VideoInfo {
        file_path: path.to_path_buf(),
        file_size: 1234,
        container: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
        duration_ms: 60_000,
        kbps: Some(8_200),
        video: Some(VideoStream {
            index: 0,
            codec: "h264".to_string(),
            width: 1920,
            height: 1080,
            fps: Some("23.98".to_string()),
            par: Some("1:1".to_string()),
            dar: Some("16:9".to_string()),
            kbps: Some(8_000),
        }),
        audio: Some(AudioStream {
            index: 1,
            codec: "aac".to_string(),
            kbps: Some(160),
            sample_rate: Some(48_000),
            channels: Some(2),
        }),
        supported: true,
    }
}

/// A file the prober reads but that has no video stream.
pub fn audio_only_info(path: &Path) -> VideoInfo {
    VideoInfo {
        file_path: path.to_path_buf(),
        container: "mpeg".to_string(),
        duration_ms: 1_000,
        supported: true,
        ..Default::default()
    }
}

/// Test configuration for a share rooted at `root`.
///
/// Audio is pinned to AC-3 at 192 kbps so size estimates use the configured
/// audio bitrate; pushes discover the loopback address.
pub fn test_config(root: &Path, extensions: Option<&[&str]>) -> Config {
    let mut config = Config::default();
    config.server.audio_codec = Some("ac3".to_string());
    config.server.push_probe_host = "127.0.0.1:9".to_string();
    config.video.extensions =
        extensions.map(|exts| exts.iter().map(|e| e.to_string()).collect());
    config.shares.insert(
        SHARE.to_string(),
        ShareConfig {
            path: root.to_path_buf(),
            share_type: "video".to_string(),
            precache: false,
        },
    );
    config.tivos.insert(
        HD_TSN.to_string(),
        TivoConfig {
            name: Some("Den".to_string()),
            height: Some(1080),
            ..Default::default()
        },
    );
    config
}

/// A temporary share with its [`VideoShare`] and fakes.
pub struct TestShare {
    pub dir: TempDir,
    pub share: VideoShare,
    pub transcoder: Arc<FakeTranscoder>,
    pub mind: Arc<RecordingMind>,
}

impl TestShare {
    /// Share that lists `.mp4` and `.tivo` files without probing.
    pub fn new() -> Self {
        Self::build(Some(&["mp4", ".TiVo"]), |_| {}, RecordingMind::default())
    }

    /// Share that probes to decide eligibility.
    pub fn probing() -> Self {
        Self::build(None, |_| {}, RecordingMind::default())
    }

    pub fn build(
        extensions: Option<&[&str]>,
        customize: impl FnOnce(&mut Config),
        mind: RecordingMind,
    ) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = test_config(dir.path(), extensions);
        customize(&mut config);

        let transcoder = Arc::new(FakeTranscoder::default());
        let mind = Arc::new(mind);
        let devices = Arc::new(DeviceRegistry::from_config(&config));
        let share = VideoShare::new(
            Arc::new(config),
            transcoder.clone(),
            transcoder.clone(),
            Arc::new(DirectoryPager),
            devices,
            mind.clone(),
        );

        Self {
            dir,
            share,
            transcoder,
            mind,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create a file (and its parent folders) below the share root.
    pub fn add_file(&self, relative: &str) -> PathBuf {
        self.write(relative, b"not really video")
    }

    pub fn write(&self, relative: &str, content: &[u8]) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create folders");
        }
        fs::write(&path, content).expect("failed to write file");
        path
    }

    /// Create a file that probes as [`h264_info`].
    pub fn add_video(&self, relative: &str) -> PathBuf {
        let path = self.add_file(relative);
        self.transcoder.script(&path, h264_info(&path));
        path
    }
}
