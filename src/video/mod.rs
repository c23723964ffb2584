//! The video share: container listings, single-item details and pushes.

pub mod classifier;
pub mod container;
pub mod details;
pub mod estimate;
pub mod metadata;
pub mod push;
pub mod sidecar;
pub mod tvbus;

pub use classifier::FormatClassifier;
pub use container::{ContainerEntry, ContainerListing, EntryBody, Tier};
pub use details::{DetailValue, VideoDetails};
pub use metadata::MetadataResolver;
pub use tvbus::TvBusItem;

use crate::config::{Config, ShareConfig};
use crate::devices::DeviceRegistry;
use crate::error::{Error, Result};
use crate::mind::{Mind, MindClient};
use crate::pager::{DirectoryPager, FilePager};
use crate::protocol::Reply;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tivoshare_av::{FfmpegTranscoder, InfoCache, ProbeCache, Transcoder};
use tivoshare_common::paths::is_hidden;
use tivoshare_common::Tsn;
use walkdir::WalkDir;

/// Share type served by [`VideoShare`].
pub const VIDEO_SHARE_TYPE: &str = "video";

/// Serves the configured video shares.
///
/// All collaborators are injected so that tests can substitute fakes for the
/// transcoder, probe cache, pager and mind.
pub struct VideoShare {
    config: Arc<Config>,
    transcoder: Arc<dyn Transcoder>,
    probe_cache: Arc<dyn ProbeCache>,
    pager: Arc<dyn FilePager>,
    devices: Arc<DeviceRegistry>,
    mind: Arc<dyn Mind>,
    classifier: FormatClassifier,
    resolver: MetadataResolver,
}

impl VideoShare {
    pub fn new(
        config: Arc<Config>,
        transcoder: Arc<dyn Transcoder>,
        probe_cache: Arc<dyn ProbeCache>,
        pager: Arc<dyn FilePager>,
        devices: Arc<DeviceRegistry>,
        mind: Arc<dyn Mind>,
    ) -> Self {
        let classifier = FormatClassifier::new(config.video_extensions(), Arc::clone(&transcoder));
        let resolver = MetadataResolver::new(Arc::clone(&config), Arc::clone(&transcoder));
        Self {
            config,
            transcoder,
            probe_cache,
            pager,
            devices,
            mind,
            classifier,
            resolver,
        }
    }

    /// Production wiring: ffprobe/ffmpeg with a shared probe cache, the
    /// directory pager and the mind client.
    pub fn from_config(config: Config) -> Result<Self> {
        let cache = Arc::new(InfoCache::new());
        let ffprobe = config
            .server
            .ffprobe
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffprobe"));
        let ffmpeg = config
            .server
            .ffmpeg
            .clone()
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));
        let transcoder = Arc::new(FfmpegTranscoder::with_tools(Arc::clone(&cache), ffprobe, ffmpeg));
        let devices = Arc::new(DeviceRegistry::from_config(&config));
        let mind = MindClient::new(&config.mind).map_err(|e| Error::Config(format!("{e:#}")))?;

        Ok(Self::new(
            Arc::new(config),
            transcoder,
            cache,
            Arc::new(DirectoryPager),
            devices,
            Arc::new(mind),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn classifier(&self) -> &FormatClassifier {
        &self.classifier
    }

    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn transcoder(&self) -> &Arc<dyn Transcoder> {
        &self.transcoder
    }

    /// The video share named by the first segment of `container`.
    fn share(&self, container: &str) -> Result<&ShareConfig> {
        let name = container.split('/').next().unwrap_or_default();
        self.config
            .share(name)
            .filter(|share| share.share_type == VIDEO_SHARE_TYPE)
            .ok_or_else(|| Error::not_found(format!("container {name}")))
    }

    /// Local directory for a `Container` value such as `Movies/Action`.
    ///
    /// Fails with [`Error::NotFound`] for unknown shares, for sub-paths that
    /// would leave the share and for directories that do not exist.
    pub fn local_root(&self, container: &str) -> Result<PathBuf> {
        let share = self.share(container)?;
        let sub = container.split_once('/').map_or("", |(_, rest)| rest);
        let root = join_inside(&share.path, sub)
            .ok_or_else(|| Error::not_found(format!("container {container}")))?;
        if !root.is_dir() {
            return Err(Error::not_found(format!(
                "container {container} ({})",
                root.display()
            )));
        }
        Ok(root)
    }

    /// Local path of `file` (share-relative, `/`-rooted) inside `container`.
    ///
    /// Only the container has to exist; a missing file resolves to a path
    /// whose descriptor is marked invalid.
    pub fn item_path(&self, container: &str, file: &str) -> Result<PathBuf> {
        let root = self.local_root(container)?;
        join_inside(&root, file).ok_or_else(|| Error::not_found(format!("{container}{file}")))
    }

    /// Full-tier descriptor of a single item, with `valid` set to its
    /// eligibility. Ineligible items keep their synthesized defaults.
    fn resolve_item(&self, path: &Path, tsn: &Tsn) -> Result<VideoDetails> {
        resolve_single_item(&self.classifier, &self.resolver, path, tsn)
    }

    /// Probe an eligible file so later listings resolve it at full tier.
    ///
    /// Returns whether the file was probed.
    pub fn pre_cache(&self, path: &Path) -> Result<bool> {
        if path.is_dir() || !self.classifier.is_eligible(path) {
            return Ok(false);
        }
        self.transcoder.video_info(path)?;
        tracing::debug!(path = %path.display(), "Pre-cached probe");
        Ok(true)
    }

    /// Probe every eligible file below the share's root.
    ///
    /// Returns the number of files probed. Hidden entries are skipped and
    /// directory links are not followed. Unreadable entries and probe
    /// failures are logged and skipped.
    pub fn pre_cache_share(&self, name: &str) -> Result<usize> {
        let root = self.local_root(name)?;
        let mut probed = 0;

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(&e.file_name().to_string_lossy()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            match self.pre_cache(path) {
                Ok(true) => probed += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Pre-cache probe failed");
                }
            }
        }

        tracing::info!(share = name, probed, "Pre-cached share");
        Ok(probed)
    }
}

fn resolve_single_item(
    classifier: &FormatClassifier,
    resolver: &MetadataResolver,
    path: &Path,
    tsn: &Tsn,
) -> Result<VideoDetails> {
    let mut details = VideoDetails::new();
    let valid = path.exists() && classifier.is_eligible(path);
    details.set("valid", valid);
    if valid {
        details.update(resolver.resolve_full(path, tsn)?);
    }
    Ok(details)
}

/// Reply for a failed protocol command.
fn failure_reply(command: &str, err: Error) -> Reply {
    match err {
        Error::NotFound(what) => {
            tracing::debug!(command, "Not found: {}", what);
            Reply::NotFound
        }
        err => {
            tracing::error!(command, error = %err, "Command failed");
            Reply::ServerError(format!("{}\n\n{}", err, err.diagnostic()))
        }
    }
}

/// Join a `/`-separated relative path onto `base`, refusing anything that
/// would escape it.
fn join_inside(base: &Path, relative: &str) -> Option<PathBuf> {
    let mut path = base.to_path_buf();
    for component in Path::new(relative.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_inside() {
        let base = Path::new("/media/Movies");
        assert_eq!(
            join_inside(base, "/Action/x.mp4"),
            Some(PathBuf::from("/media/Movies/Action/x.mp4"))
        );
        assert_eq!(join_inside(base, ""), Some(base.to_path_buf()));
        assert_eq!(join_inside(base, "/../etc/passwd"), None);
        assert_eq!(join_inside(base, "Action/../../x"), None);
    }

    #[test]
    fn test_failure_reply() {
        assert_eq!(
            failure_reply("QueryContainer", Error::not_found("Movies")),
            Reply::NotFound
        );
        let reply = failure_reply("Push", Error::Config("bad".to_string()));
        assert!(matches!(reply, Reply::ServerError(body) if body.starts_with("configuration error: bad\n\n")));
    }
}
