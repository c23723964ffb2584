//! XML rendering of container listings and TVBus items.
//!
//! Renderers take the assembled structures by `&mut` because reading a
//! [`VideoDetails`] field may materialize its default.

use crate::devices::KnownDevice;
use crate::error::Result;
use crate::video::container::{ContainerEntry, ContainerListing, EntryBody};
use crate::video::details::{DetailValue, VideoDetails};
use crate::video::tvbus::TvBusItem;
use xmltree::{Element, EmitterConfig, XMLNode};

const CONTAINER_NS: &str = "http://www.tivo.com/developer/calypso-protocol-1.6/";
const TVBUS_NS: &str = "http://tivo.com/developer/xml/idl/TvBusMarshalledStruct";
const TVPGD_RECORDING_NS: &str = "http://tivo.com/developer/xml/idl/TvPgdRecording";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Multi-valued program fields, in the order they appear in `program`.
const PROGRAM_LISTS_BEFORE_COLOR: &[&str] = &["vActor", "vAdvisory", "vChoreographer"];
const PROGRAM_LISTS_AFTER_TITLE: &[&str] = &[
    "vDirector",
    "vExecProducer",
    "vProgramGenre",
    "vGuestStar",
    "vHost",
];

/// Values the rendering step needs besides the entries themselves.
#[derive(Clone)]
pub struct RenderContext {
    pub quote: fn(&str) -> String,
    pub crc: fn(&str) -> u32,
    pub guid: String,
    pub devices: Vec<KnownDevice>,
}

impl RenderContext {
    pub fn new(guid: impl Into<String>, devices: Vec<KnownDevice>) -> Self {
        Self {
            quote,
            crc,
            guid: guid.into(),
            devices,
        }
    }
}

/// Percent-encode `text` for use in a URL path, keeping `/` separators.
pub fn quote(text: &str) -> String {
    text.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// CRC-32 of `text`, used as a stable unique id.
pub fn crc(text: &str) -> u32 {
    crc32fast::hash(text.as_bytes())
}

fn element(name: &str) -> Element {
    Element::new(name)
}

fn text_element(name: &str, text: impl Into<String>) -> Element {
    let mut elem = Element::new(name);
    let text = text.into();
    if !text.is_empty() {
        elem.children.push(XMLNode::Text(text));
    }
    elem
}

fn push(parent: &mut Element, child: Element) {
    parent.children.push(XMLNode::Element(child));
}

fn push_text(parent: &mut Element, name: &str, text: impl Into<String>) {
    push(parent, text_element(name, text));
}

/// `<name><element>a</element><element>b</element></name>`
fn list_element(name: &str, items: &[String]) -> Element {
    let mut elem = element(name);
    for item in items {
        push_text(&mut elem, "element", item.clone());
    }
    elem
}

/// `<name value="id">code</name>`
fn coded_element(name: &str, value: &DetailValue) -> Element {
    match value {
        DetailValue::Coded { code, id } => {
            let mut elem = text_element(name, code.clone());
            elem.attributes.insert("value".to_string(), id.clone());
            elem
        }
        other => text_element(name, other.to_string()),
    }
}

fn link(url: String, content_type: &str) -> Element {
    let mut url_elem = element("Url");
    url_elem.children.push(XMLNode::Text(url));
    let mut content = element("Content");
    push(&mut content, url_elem);
    push_text(&mut content, "ContentType", content_type);
    content
}

fn write(root: &Element) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(true)
        .indent_string("  ");
    root.write_with_config(&mut buf, config)?;
    Ok(buf)
}

/// Render a container listing as a `TiVoContainer` document.
pub fn render_container(listing: &mut ContainerListing) -> Result<Vec<u8>> {
    let quote = listing.context.quote;
    let crc = listing.context.crc;

    let mut root = element("TiVoContainer");
    root.attributes
        .insert("xmlns".to_string(), CONTAINER_NS.to_string());

    let mut details = element("Details");
    push_text(&mut details, "Title", listing.name.clone());
    push_text(&mut details, "ContentType", "x-container/tivo-videos");
    push_text(&mut details, "SourceFormat", "x-container/folder");
    push_text(&mut details, "TotalItems", listing.total.to_string());
    push_text(&mut details, "UniqueId", crc(&listing.name).to_string());
    push(&mut root, details);

    push_text(&mut root, "ItemStart", listing.start.to_string());
    push_text(&mut root, "ItemCount", listing.entries.len().to_string());

    let container = listing.container.clone();
    for entry in &mut listing.entries {
        push(&mut root, render_entry(entry, &container, quote, crc));
    }

    if !listing.context.devices.is_empty() {
        let mut tivos = element("Tivos");
        for device in &listing.context.devices {
            let mut tivo = text_element("Tivo", device.name.clone().unwrap_or_else(|| device.tsn.to_string()));
            tivo.attributes
                .insert("tsn".to_string(), device.tsn.to_string());
            push(&mut tivos, tivo);
        }
        push(&mut root, tivos);
    }

    write(&root)
}

fn render_entry(
    entry: &mut ContainerEntry,
    container: &str,
    quote: fn(&str) -> String,
    crc: fn(&str) -> u32,
) -> Element {
    let mut item = element("Item");
    let mut details = element("Details");
    let mut links = element("Links");

    match &mut entry.body {
        EntryBody::Folder {
            small_path,
            total_items,
        } => {
            push_text(&mut details, "Title", entry.title.clone());
            push_text(&mut details, "ContentType", "x-container/folder");
            push_text(&mut details, "SourceFormat", "x-tivo-container/folder");
            push_text(&mut details, "TotalItems", total_items.to_string());
            push_text(&mut details, "LastCaptureDate", entry.capture_date.clone());
            push_text(&mut details, "UniqueId", crc(small_path).to_string());

            let url = format!(
                "/TiVoConnect?Command=QueryContainer&Container={}",
                quote(small_path)
            );
            push(&mut links, link(url, "x-tivo-container/folder"));
        }
        EntryBody::File { details: video, .. } => {
            let valid = video.get("valid").as_flag();
            push_text(&mut details, "Title", video.text("title"));
            push_text(&mut details, "ContentType", "video/x-tivo-mpeg");
            push_text(&mut details, "SourceFormat", "video/x-tivo-mpeg");
            if valid {
                push_text(&mut details, "SourceSize", video.text("size"));
                push_text(&mut details, "Duration", video.text("duration"));
                push_text(&mut details, "Description", video.text("description"));
                push_text(&mut details, "SourceChannel", video.text("displayMajorNumber"));
                push_text(&mut details, "SourceStation", video.text("callsign"));
                push_text(&mut details, "SeriesId", video.text("seriesId"));
                push_text(&mut details, "EpisodeTitle", video.text("episodeTitle"));
            }
            push_text(&mut details, "CaptureDate", entry.capture_date.clone());
            push_text(&mut details, "ValidVideo", if valid { "Yes" } else { "No" });

            let content_url = format!("/{}{}", quote(container), quote(&entry.part_path));
            push(&mut links, link(content_url, "video/x-tivo-mpeg"));

            let mut icon = element("CustomIcon");
            push_text(&mut icon, "Url", "urn:tivo:image:save-until-i-delete-recording");
            push_text(&mut icon, "ContentType", "video/*");
            push_text(&mut icon, "AcceptsParams", "No");
            push(&mut links, icon);

            let details_url = format!(
                "/TiVoConnect?Command=TVBusQuery&Container={}&File={}",
                quote(container),
                quote(&entry.part_path)
            );
            let mut tvbus = element("TiVoVideoDetails");
            push_text(&mut tvbus, "Url", details_url);
            push_text(&mut tvbus, "ContentType", "text/xml");
            push_text(&mut tvbus, "AcceptsParams", "No");
            push(&mut links, tvbus);
        }
    }

    push(&mut item, details);
    push(&mut item, links);
    item
}

/// Render a single item as a `TvBusEnvelope` document.
pub fn render_tvbus(item: &mut TvBusItem) -> Result<Vec<u8>> {
    let video = &mut item.details;

    let mut root = element("TvBusMarshalledStruct:TvBusEnvelope");
    root.attributes
        .insert("xmlns:xs".to_string(), XSI_NS.to_string());
    root.attributes
        .insert("xmlns:TvBusMarshalledStruct".to_string(), TVBUS_NS.to_string());
    root.attributes
        .insert("xmlns:TvPgdRecording".to_string(), TVPGD_RECORDING_NS.to_string());
    root.attributes
        .insert("xs:type".to_string(), "TvPgdRecording:TvPgdRecording".to_string());

    push_text(&mut root, "valid", video.get("valid").as_flag().to_string());
    push_text(&mut root, "recordedDuration", video.text("iso_duration"));
    push(&mut root, element("vActualShowing"));
    push(&mut root, element("vBookmark"));

    let mut quality = text_element("recordingQuality", "HIGH");
    quality.attributes.insert("value".to_string(), "75".to_string());
    push(&mut root, quality);

    let mut showing = element("showing");
    let mut bits = element("showingBits");
    bits.attributes
        .insert("value".to_string(), video.text("showingBits"));
    push(&mut showing, bits);
    push_text(&mut showing, "time", video.text("time"));
    push_text(&mut showing, "duration", video.text("iso_duration"));
    push(&mut showing, render_program(video));

    let mut channel = element("channel");
    push_text(&mut channel, "displayMajorNumber", video.text("displayMajorNumber"));
    push_text(&mut channel, "displayMinorNumber", video.text("displayMinorNumber"));
    push_text(&mut channel, "callsign", video.text("callsign"));
    push(&mut showing, channel);

    let rating = video.get("tvRating").clone();
    push(&mut showing, coded_element("tvRating", &rating));
    push(&mut root, showing);

    push_text(&mut root, "startTime", video.text("startTime"));
    push_text(&mut root, "stopTime", video.text("stopTime"));

    write(&root)
}

fn render_program(video: &mut VideoDetails) -> Element {
    let mut program = element("program");

    for key in PROGRAM_LISTS_BEFORE_COLOR {
        push(&mut program, list_element(key, &video.list(key)));
    }
    let color = video.get("colorCode").clone();
    push(&mut program, coded_element("colorCode", &color));
    push_text(&mut program, "description", video.text("description"));
    push_text(&mut program, "episodeNumber", video.text("episodeNumber"));
    push_text(&mut program, "episodeTitle", video.text("episodeTitle"));
    for key in PROGRAM_LISTS_AFTER_TITLE {
        push(&mut program, list_element(key, &video.list(key)));
    }
    push_text(&mut program, "isEpisode", video.text("isEpisode"));
    push_text(&mut program, "originalAirDate", video.text("originalAirDate"));
    push(&mut program, list_element("vProducer", &video.list("vProducer")));

    let mut series = element("series");
    push_text(&mut series, "isEpisodic", "true");
    push(&mut series, list_element("vSeriesGenre", &video.list("vSeriesGenre")));
    push_text(&mut series, "seriesTitle", video.text("seriesTitle"));
    push(&mut program, series);

    let show_type = video.get("showType").clone();
    push(&mut program, coded_element("showType", &show_type));
    push_text(&mut program, "title", video.text("title"));
    push(&mut program, list_element("vWriter", &video.list("vWriter")));

    program
}
