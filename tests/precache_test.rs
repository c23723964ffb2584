//! Integration tests for warming the probe cache ahead of listings.

mod common;

use assert_matches::assert_matches;
use common::{TestShare, SHARE};
use tivoshare::video::Tier;
use tivoshare::{Error, TivoQuery};

#[test]
fn share_walk_probes_each_eligible_file_once() {
    let t = TestShare::new();
    let top = t.add_video("a.mp4");
    let nested = t.add_video("Action/b.mp4");
    let deeper = t.add_video("Action/Sequels/c.mp4");
    t.add_file("notes.nfo");
    t.add_file(".hidden.mp4");
    t.add_file(".meta/d.mp4");

    let probed = t.share.pre_cache_share(SHARE).unwrap();
    assert_eq!(probed, 3);

    let mut paths = t.transcoder.probed_paths();
    paths.sort();
    let mut expected = vec![top, nested, deeper];
    expected.sort();
    assert_eq!(paths, expected);
}

#[test]
fn unreadable_videos_are_skipped() {
    let t = TestShare::new();
    t.add_video("good.mp4");
    t.add_file("broken.mp4");

    assert_eq!(t.share.pre_cache_share(SHARE).unwrap(), 1);
    assert_eq!(t.transcoder.probes(), 2);
}

#[cfg(unix)]
#[test]
fn directory_links_are_not_followed() {
    let t = TestShare::new();
    let movie = t.add_video("a.mp4");
    std::os::unix::fs::symlink(t.root(), t.root().join("loop")).unwrap();

    assert_eq!(t.share.pre_cache_share(SHARE).unwrap(), 1);
    assert_eq!(t.transcoder.probed_paths(), vec![movie]);
}

#[test]
fn pre_cached_files_list_at_full_tier() {
    let t = TestShare::new();
    t.add_video("a.mp4");
    t.add_video("b.mp4");
    t.share.pre_cache_share(SHARE).unwrap();
    t.add_video("c.mp4");

    let listing = t.share.container_listing(&TivoQuery::container(SHARE)).unwrap();
    let tiers: Vec<_> = listing.entries.iter().map(|e| e.tier()).collect();
    assert_eq!(
        tiers,
        vec![Some(Tier::Full), Some(Tier::Full), Some(Tier::Basic)]
    );
}

#[test]
fn unknown_share_is_not_found() {
    let t = TestShare::new();
    assert_matches!(t.share.pre_cache_share("Nope"), Err(Error::NotFound(_)));
}
