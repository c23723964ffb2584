//! Integration tests for single-item (TVBusQuery) details.

mod common;

use assert_matches::assert_matches;
use common::{TestShare, HD_TSN, SHARE};
use tivoshare::{Error, Reply, TivoQuery};

fn query(file: &str) -> TivoQuery {
    TivoQuery::container(SHARE).with_file(file)
}

fn xml(reply: Reply) -> String {
    match reply {
        Reply::Xml(body) => String::from_utf8(body).unwrap(),
        other => panic!("expected XML reply, got {other:?}"),
    }
}

#[test]
fn eligible_item_is_resolved_in_full() {
    let t = TestShare::new();
    t.add_video("Action/Movie.mp4");
    t.write("Action/Movie.mp4.txt", b"seriesTitle: Saga\nepisodeTitle: Part One\n");

    let mut item = t.share.tvbus_item(&query("/Action/Movie.mp4")).unwrap();
    assert!(item.details.get("valid").as_flag());
    assert_eq!(item.details.text("title"), "Movie");
    assert_eq!(item.details.text("seriesTitle"), "Saga");
    assert_eq!(item.details.text("iso_duration"), "P0DT0H1M0S");
    // Unknown devices are not high definition targets.
    assert_eq!(item.details.text("showingBits"), "0");

    let body = xml(t.share.tvbus_query(&query("/Action/Movie.mp4")));
    assert!(body.contains("<valid>true</valid>"));
    assert!(body.contains("<recordedDuration>P0DT0H1M0S</recordedDuration>"));
    assert!(body.contains("<seriesTitle>Saga</seriesTitle>"));
    assert!(body.contains("<episodeTitle>Part One</episodeTitle>"));
    assert!(body.contains("<element>SOURCE INFO: </element>"));
}

#[test]
fn hd_source_for_hd_device_sets_showing_bits() {
    let t = TestShare::new();
    t.add_video("Movie.mp4");

    let mut item = t
        .share
        .tvbus_item(&query("/Movie.mp4").with_tsn(HD_TSN))
        .unwrap();
    assert_eq!(item.details.text("showingBits"), "4096");
}

#[test]
fn native_recording_never_sets_showing_bits() {
    let t = TestShare::new();
    let path = t.add_file("Show.TiVo");
    t.transcoder.script(&path, common::h264_info(&path));

    let mut item = t
        .share
        .tvbus_item(&query("/Show.TiVo").with_tsn(HD_TSN))
        .unwrap();
    assert!(item.details.get("valid").as_flag());
    assert_eq!(item.details.text("showingBits"), "0");
    // Native recordings are sent as they are.
    assert_eq!(item.details.get("size").as_number(), Some(16));
}

#[test]
fn ineligible_item_keeps_defaults_without_probing() {
    let t = TestShare::new();
    t.add_file("notes.nfo");

    let mut item = t.share.tvbus_item(&query("/notes.nfo")).unwrap();
    assert!(!item.details.get("valid").as_flag());
    assert_eq!(item.details.text("title"), "");
    assert_eq!(item.details.text("episodeNumber"), "0");
    assert_eq!(t.transcoder.probes(), 0);

    let body = xml(t.share.tvbus_query(&query("/notes.nfo")));
    assert!(body.contains("<valid>false</valid>"));
}

#[test]
fn probe_failure_is_a_server_error() {
    let t = TestShare::new();
    t.add_file("broken.mp4");

    assert_matches!(
        t.share.tvbus_item(&query("/broken.mp4")),
        Err(Error::Probe(_))
    );
    assert_matches!(
        t.share.tvbus_query(&query("/broken.mp4")),
        Reply::ServerError(body) if body.contains("Invalid data found")
    );
}

#[test]
fn missing_file_is_described_as_invalid() {
    let t = TestShare::new();

    let mut item = t.share.tvbus_item(&query("/missing.mp4")).unwrap();
    assert!(!item.details.get("valid").as_flag());
    assert_eq!(item.details.text("title"), "");
    assert_eq!(t.transcoder.probes(), 0);

    let body = xml(t.share.tvbus_query(&query("/missing.mp4")));
    assert!(body.contains("<valid>false</valid>"));
}

#[test]
fn unknown_container_or_escaping_path_is_not_found() {
    let t = TestShare::new();
    assert_eq!(
        t.share
            .tvbus_query(&TivoQuery::container("Nope").with_file("/x.mp4")),
        Reply::NotFound
    );
    assert_eq!(
        t.share.tvbus_query(&query("/../outside.mp4")),
        Reply::NotFound
    );
}
