//! Path utilities for share listings.
//!
//! Helpers to classify files by extension, derive display titles, and express
//! filesystem paths relative to a share root the way the TiVoConnect protocol
//! addresses them.

use std::path::{Path, MAIN_SEPARATOR, MAIN_SEPARATOR_STR};

/// Extension of the native TiVo recording container.
pub const NATIVE_EXTENSION: &str = "tivo";

/// Lowercased extension of a path, without the leading dot.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tivoshare_common::paths::extension_lower;
///
/// assert_eq!(extension_lower(Path::new("/a/Movie.MPG")).as_deref(), Some("mpg"));
/// assert_eq!(extension_lower(Path::new("README")), None);
/// ```
pub fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Normalize a configured extension (`".MPG"`, `"mpg"`) to `"mpg"`.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Check whether the path's extension appears in an allow-list of
/// normalized extensions.
pub fn has_extension_in(path: &Path, allowed: &[String]) -> bool {
    extension_lower(path)
        .map(|ext| allowed.iter().any(|a| *a == ext))
        .unwrap_or(false)
}

/// Whether the path is a native `.tivo` recording.
pub fn is_native_recording(path: &Path) -> bool {
    extension_lower(path).as_deref() == Some(NATIVE_EXTENSION)
}

/// Whether a directory entry name is hidden (dot-prefixed).
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Display title for a file name: the name with its final extension removed.
///
/// # Examples
///
/// ```
/// use tivoshare_common::paths::title_from_file_name;
///
/// assert_eq!(title_from_file_name("The.Show.S01E02.mpg"), "The.Show.S01E02");
/// assert_eq!(title_from_file_name("noext"), "noext");
/// ```
pub fn title_from_file_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => name.to_string(),
    }
}

/// File name component of a path as UTF-8 (lossy).
pub fn file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Path of `path` relative to the share root `base`, always rooted with a
/// leading separator.
///
/// The first occurrence of `base` is removed from `path`; the remainder is
/// prefixed with a separator when it does not already start with one.
///
/// # Examples
///
/// ```
/// use tivoshare_common::paths::part_path;
///
/// assert_eq!(part_path("/media/Movies", "/media/Movies/Action/x.mp4"), "/Action/x.mp4");
/// assert_eq!(part_path("/media/Movies/", "/media/Movies/x.mp4"), "/x.mp4");
/// ```
pub fn part_path(base: &str, path: &str) -> String {
    let relative = if base.is_empty() {
        path.to_string()
    } else {
        path.replacen(base, "", 1)
    };
    if relative.starts_with(MAIN_SEPARATOR) {
        relative
    } else {
        format!("{MAIN_SEPARATOR_STR}{relative}")
    }
}
