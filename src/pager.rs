//! Directory listing and result windowing for container queries.

use std::io;
use std::path::{Path, PathBuf};
use tivoshare_common::paths::{file_name_lossy, is_hidden};

/// URL prefix of anchors that point at a folder rather than a file.
const QUERY_CONTAINER_PREFIX: &str = "/TiVoConnect?Command=QueryContainer&Container=";

/// Window requested by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Number of entries wanted; negative counts page backwards from the
    /// anchor. `None` returns every entry.
    pub item_count: Option<i64>,
    /// Entry the window is positioned relative to.
    pub anchor: Option<PathBuf>,
    /// Extra offset applied after positioning on the anchor.
    pub anchor_offset: i64,
}

/// One window of a directory listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub files: Vec<PathBuf>,
    /// Number of entries that passed the filter.
    pub total: usize,
    /// Index of the first returned entry.
    pub start: usize,
}

/// Produces pages of a container's children.
pub trait FilePager: Send + Sync {
    fn get_files(
        &self,
        dir: &Path,
        request: &PageRequest,
        filter: &dyn Fn(&Path) -> bool,
    ) -> io::Result<Page>;
}

/// [`FilePager`] over the local filesystem.
///
/// Children are listed without hidden entries, directories first, then by
/// case-insensitive name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryPager;

impl FilePager for DirectoryPager {
    fn get_files(
        &self,
        dir: &Path,
        request: &PageRequest,
        filter: &dyn Fn(&Path) -> bool,
    ) -> io::Result<Page> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if is_hidden(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let path = entry.path();
            if filter(&path) {
                entries.push((path.is_dir(), file_name_lossy(&path).to_lowercase(), path));
            }
        }
        entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let files = entries.into_iter().map(|(_, _, path)| path).collect();
        Ok(window(files, request))
    }
}

/// Cut the requested window out of a sorted listing.
pub fn window(files: Vec<PathBuf>, request: &PageRequest) -> Page {
    let total = files.len();
    let Some(count) = request.item_count.filter(|_| total > 0) else {
        return Page {
            files,
            total,
            start: 0,
        };
    };

    let mut index: i64 = 0;
    if let Some(anchor) = &request.anchor {
        match files.iter().position(|f| f == anchor) {
            Some(found) => {
                index = found as i64;
                if count > 0 {
                    index += 1;
                }
            }
            None => {
                tracing::debug!(anchor = %anchor.display(), "Anchor not found");
            }
        }
        index += request.anchor_offset;
    }

    let (index, count) = if count < 0 {
        ((index + count).rem_euclid(total as i64), -count)
    } else {
        (index.max(0), count)
    };

    let start = (index as usize).min(total);
    let end = start.saturating_add(count as usize).min(total);
    Page {
        files: files[start..end].to_vec(),
        total,
        start,
    }
}

/// Turn an `AnchorItem` URL into the local path it names.
///
/// `container` is the share name and `base` its local root.
pub fn resolve_anchor(anchor: &str, container: &str, base: &Path) -> PathBuf {
    let anchor = match anchor.strip_prefix(QUERY_CONTAINER_PREFIX) {
        Some(rest) => format!("/{rest}"),
        None => anchor.to_string(),
    };
    let anchor = urlencoding::decode(&anchor)
        .map(|a| a.into_owned())
        .unwrap_or(anchor);

    let share_prefix = format!("/{container}");
    let relative = anchor.strip_prefix(&share_prefix).unwrap_or(&anchor);
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        base.to_path_buf()
    } else {
        base.join(relative)
    }
}
