//! `QueryContainer`: one page of a share directory with per-entry metadata.

use super::details::VideoDetails;
use super::metadata::{capture_date, modified_secs};
use super::{failure_reply, VideoShare};
use crate::error::Result;
use crate::protocol::{Reply, TivoQuery};
use crate::render::{render_container, RenderContext};
use std::io;
use std::path::{Path, PathBuf};
use tivoshare_common::paths::{file_name_lossy, has_extension_in, is_hidden, part_path};
use tivoshare_common::Tsn;

/// How deeply a listed file was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// File name, modification time and sidecar text.
    Basic,
    /// Basic plus probed duration, size estimate and transcode diagnostics.
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryBody {
    Folder {
        /// `Container` value that lists this folder.
        small_path: String,
        /// Best-effort count of listable children.
        total_items: usize,
    },
    File {
        tier: Tier,
        details: VideoDetails,
    },
}

/// One child of the listed directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerEntry {
    /// Modification time as hex epoch seconds.
    pub capture_date: String,
    pub name: String,
    pub path: PathBuf,
    /// Path below the share root, starting with a separator.
    pub part_path: String,
    pub title: String,
    pub body: EntryBody,
}

impl ContainerEntry {
    pub fn is_dir(&self) -> bool {
        matches!(self.body, EntryBody::Folder { .. })
    }

    pub fn tier(&self) -> Option<Tier> {
        match &self.body {
            EntryBody::File { tier, .. } => Some(*tier),
            EntryBody::Folder { .. } => None,
        }
    }

    pub fn details_mut(&mut self) -> Option<&mut VideoDetails> {
        match &mut self.body {
            EntryBody::File { details, .. } => Some(details),
            EntryBody::Folder { .. } => None,
        }
    }
}

/// A page of a container, ready to render.
#[derive(Clone)]
pub struct ContainerListing {
    /// Share name.
    pub container: String,
    /// Requested `Container` value, share name plus sub-path.
    pub name: String,
    pub total: usize,
    pub start: usize,
    pub entries: Vec<ContainerEntry>,
    pub context: RenderContext,
}

impl VideoShare {
    /// Build the listing for a `QueryContainer` request.
    pub fn container_listing(&self, query: &TivoQuery) -> Result<ContainerListing> {
        let share = self.share(&query.container)?;
        let root = self.local_root(&query.container)?;

        let request = query.page_request(&share.path);
        let filter = |path: &Path| self.classifier.is_eligible(path);
        let page = self.pager.get_files(&root, &request, &filter)?;

        let base = share.path.to_string_lossy();
        let force_full = share.precache || page.files.len() == 1;
        let mut entries = Vec::with_capacity(page.files.len());
        for path in &page.files {
            entries.push(self.container_entry(path, &base, &query.container, force_full, &query.tsn)?);
        }

        tracing::info!(
            container = %query.container,
            tsn = %query.tsn,
            total = page.total,
            start = page.start,
            count = entries.len(),
            "Listed container"
        );

        Ok(ContainerListing {
            container: query.share_name().to_string(),
            name: query.container.clone(),
            total: page.total,
            start: page.start,
            entries,
            context: RenderContext::new(self.config.guid(), self.devices.snapshot()),
        })
    }

    /// Handle `QueryContainer`.
    pub fn query_container(&self, query: &TivoQuery) -> Reply {
        match self
            .container_listing(query)
            .and_then(|mut listing| render_container(&mut listing))
        {
            Ok(xml) => Reply::Xml(xml),
            Err(err) => failure_reply("QueryContainer", err),
        }
    }

    fn container_entry(
        &self,
        path: &Path,
        base: &str,
        container: &str,
        force_full: bool,
        tsn: &Tsn,
    ) -> Result<ContainerEntry> {
        let name = file_name_lossy(path);
        let body = if path.is_dir() {
            EntryBody::Folder {
                small_path: format!("{container}/{name}"),
                total_items: self.nested_count(path),
            }
        } else {
            let cached = self.probe_cache.has_cached_probe(path);
            let tier = if force_full || cached {
                Tier::Full
            } else {
                Tier::Basic
            };
            tracing::debug!(path = %path.display(), ?tier, cached, "Selected tier");

            let mut details = VideoDetails::new();
            details.set("title", name.clone());
            let tier = self.resolve_entry(path, tier, tsn, &mut details)?;
            EntryBody::File { tier, details }
        };

        Ok(ContainerEntry {
            capture_date: capture_date(modified_secs(path)?),
            title: name.clone(),
            name,
            path: path.to_path_buf(),
            part_path: part_path(base, &path.to_string_lossy()),
            body,
        })
    }

    /// Resolve a listed file at `tier`; returns the tier actually used.
    ///
    /// A probe failure at full tier does not fail the listing: the entry falls
    /// back to basic metadata and is marked invalid.
    fn resolve_entry(
        &self,
        path: &Path,
        tier: Tier,
        tsn: &Tsn,
        details: &mut VideoDetails,
    ) -> Result<Tier> {
        if tier == Tier::Basic {
            details.set("valid", true);
            details.update(self.resolver.resolve_basic(path)?);
            return Ok(Tier::Basic);
        }

        let valid = self.transcoder.supported_format(path);
        details.set("valid", valid);
        if !valid {
            return Ok(Tier::Full);
        }
        match self.resolver.resolve_full(path, tsn) {
            Ok(full) => {
                details.update(full);
                Ok(Tier::Full)
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "Probe failed, listing basic metadata");
                details.set("valid", false);
                details.update(self.resolver.resolve_basic(path)?);
                Ok(Tier::Basic)
            }
        }
    }

    /// Number of listable children of `dir`; 0 when it cannot be read.
    fn nested_count(&self, dir: &Path) -> usize {
        self.scan_nested(dir).unwrap_or_else(|err| {
            tracing::warn!(dir = %dir.display(), error = %err, "Could not count folder items");
            0
        })
    }

    /// Count subdirectories and files that would be listed without probing:
    /// allow-list matches, or files already probed and supported.
    fn scan_nested(&self, dir: &Path) -> io::Result<usize> {
        let mut count = 0;
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if is_hidden(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let path = entry.path();
            let listed = if path.is_dir() {
                true
            } else {
                match self.classifier.extensions() {
                    Some(allowed) => has_extension_in(&path, allowed),
                    None => {
                        self.probe_cache.has_cached_probe(&path)
                            && self.transcoder.supported_format(&path)
                    }
                }
            };
            if listed {
                count += 1;
            }
        }
        Ok(count)
    }
}
