//! User-authored metadata stored next to a video file.
//!
//! Up to three text files are read, in order:
//!
//! 1. `default.txt` in the file's directory
//! 2. `<file name>.txt` beside the file
//! 3. `.meta/<file name>.txt` in the file's directory
//!
//! Each line is `key: value`. Later files override earlier ones, except for
//! multi-valued keys (leading `v`), which accumulate.

use super::details::{DetailValue, VideoDetails, MULTI_VALUE_PREFIX};
use std::io;
use std::path::{Path, PathBuf};
use tivoshare_common::paths::file_name_lossy;

const DIRECTORY_DEFAULTS: &str = "default.txt";
const META_DIR: &str = ".meta";

/// Candidate sidecar files for `path`, in merge order.
pub fn candidates(path: &Path) -> Vec<PathBuf> {
    let name = file_name_lossy(path);
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    let mut beside = path.as_os_str().to_owned();
    beside.push(".txt");

    vec![
        dir.join(DIRECTORY_DEFAULTS),
        PathBuf::from(beside),
        dir.join(META_DIR).join(format!("{name}.txt")),
    ]
}

/// Parse `key: value` lines, skipping comments and lines without a colon.
pub fn parse_lines(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Merge parsed pairs into `record`.
pub fn merge(record: &mut VideoDetails, pairs: Vec<(String, String)>) {
    let mut lists: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in pairs {
        if key.starts_with(MULTI_VALUE_PREFIX) {
            match lists.iter_mut().find(|(k, _)| *k == key) {
                Some((_, items)) => items.push(value),
                None => {
                    let mut items = record.list(&key);
                    items.push(value);
                    lists.push((key, items));
                }
            }
        } else {
            record.set(key, value);
        }
    }
    record.extend(lists.into_iter().map(|(k, v)| (k, DetailValue::List(v))));
}

/// Load the sidecar record for `path`.
///
/// Missing sidecar files are the common case and are skipped. Unreadable
/// ones are logged and skipped.
pub fn load(path: &Path) -> VideoDetails {
    let mut record = VideoDetails::new();
    for candidate in candidates(path) {
        match read(&candidate) {
            Ok(Some(pairs)) => merge(&mut record, pairs),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(path = %candidate.display(), error = %e, "Skipping unreadable metadata file");
            }
        }
    }
    record
}

fn read(path: &Path) -> io::Result<Option<Vec<(String, String)>>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(parse_lines(&String::from_utf8_lossy(&bytes)))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_lines() {
        let pairs = parse_lines("# comment\ntitle : Pilot \nno separator\n  # indented\ntime: 10:30\n");
        assert_eq!(
            pairs,
            vec![
                ("title".to_string(), "Pilot".to_string()),
                ("time".to_string(), "10:30".to_string()),
            ]
        );
    }

    #[test]
    fn test_candidates_order() {
        let c = candidates(Path::new("/m/shows/ep1.mpg"));
        assert_eq!(c[0], PathBuf::from("/m/shows/default.txt"));
        assert_eq!(c[1], PathBuf::from("/m/shows/ep1.mpg.txt"));
        assert_eq!(c[2], PathBuf::from("/m/shows/.meta/ep1.mpg.txt"));
    }

    #[test]
    fn test_later_files_override_and_lists_accumulate() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("ep1.mpg");
        fs::write(&video, b"").unwrap();
        fs::write(
            dir.path().join("default.txt"),
            "title: Default\nseriesTitle: The Show\nvGenre: Drama\n",
        )
        .unwrap();
        fs::write(dir.path().join("ep1.mpg.txt"), "title: Pilot\nvGenre: Comedy\n").unwrap();

        let mut record = load(&video);
        assert_eq!(record.text("title"), "Pilot");
        assert_eq!(record.text("seriesTitle"), "The Show");
        assert_eq!(record.list("vGenre"), vec!["Drama", "Comedy"]);
    }

    #[test]
    fn test_hidden_meta_file_wins() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("ep1.mpg");
        fs::create_dir(dir.path().join(".meta")).unwrap();
        fs::write(dir.path().join("ep1.mpg.txt"), "description: beside\n").unwrap();
        fs::write(dir.path().join(".meta/ep1.mpg.txt"), "description: hidden\nvActor: A\nvActor: B\n")
            .unwrap();

        let mut record = load(&video);
        assert_eq!(record.text("description"), "hidden");
        assert_eq!(record.list("vActor"), vec!["A", "B"]);
    }

    #[test]
    fn test_no_sidecars() {
        let dir = tempdir().unwrap();
        let record = load(&dir.path().join("lonely.mkv"));
        assert!(record.is_empty());
    }
}
