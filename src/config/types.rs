use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub video: VideoConfig,

    /// Shared containers keyed by the name devices browse them under.
    #[serde(default)]
    pub shares: BTreeMap<String, ShareConfig>,

    /// Per-device overrides keyed by TiVo service number.
    #[serde(default)]
    pub tivos: BTreeMap<String, TivoConfig>,

    #[serde(default)]
    pub mind: MindConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Server identity advertised in container listings.
    #[serde(default = "default_guid")]
    pub guid: String,

    #[serde(default)]
    pub debug: bool,

    /// Target frame width, snapped to the nearest width a TiVo accepts.
    #[serde(default)]
    pub width: Option<u32>,

    /// Target frame height, snapped to the nearest height a TiVo accepts.
    #[serde(default)]
    pub height: Option<u32>,

    #[serde(default = "default_audio_br")]
    pub audio_br: String,

    #[serde(default = "default_video_br")]
    pub video_br: String,

    /// Highest audio bitrate in kbps.
    #[serde(default = "default_max_audio_br")]
    pub max_audio_br: u32,

    #[serde(default = "default_max_video_br")]
    pub max_video_br: String,

    /// Fixed output audio codec. When unset, size estimates assume the
    /// maximum audio bitrate.
    #[serde(default)]
    pub audio_codec: Option<String>,

    #[serde(default = "default_buffer_size")]
    pub buffer_size: String,

    /// Path to ffmpeg (default: looked up on PATH)
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to ffprobe (default: looked up on PATH)
    #[serde(default)]
    pub ffprobe: Option<PathBuf>,

    /// UDP endpoint connected to (without sending) to learn the local
    /// address devices can reach.
    #[serde(default = "default_push_probe_host")]
    pub push_probe_host: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    9032
}
fn default_guid() -> String {
    uuid::Uuid::new_v4().to_string()
}
fn default_audio_br() -> String {
    "192K".to_string()
}
fn default_video_br() -> String {
    "4096K".to_string()
}
fn default_max_audio_br() -> u32 {
    448
}
fn default_max_video_br() -> String {
    "17408K".to_string()
}
fn default_buffer_size() -> String {
    "1024k".to_string()
}
fn default_push_probe_host() -> String {
    "tivo.com:123".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            guid: default_guid(),
            debug: false,
            width: None,
            height: None,
            audio_br: default_audio_br(),
            video_br: default_video_br(),
            max_audio_br: default_max_audio_br(),
            max_video_br: default_max_video_br(),
            audio_codec: None,
            buffer_size: default_buffer_size(),
            ffmpeg: None,
            ffprobe: None,
            push_probe_host: default_push_probe_host(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VideoConfig {
    /// Static extension allow-list. When absent, eligibility is decided by
    /// probing.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShareConfig {
    pub path: PathBuf,

    #[serde(rename = "type", default = "default_share_type")]
    pub share_type: String,

    /// Resolve full metadata for every listed file.
    #[serde(default)]
    pub precache: bool,
}

fn default_share_type() -> String {
    "video".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TivoConfig {
    /// Human-readable device name, accepted in place of the serial.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub aspect169: Option<bool>,

    #[serde(default)]
    pub width: Option<u32>,

    #[serde(default)]
    pub height: Option<u32>,

    #[serde(default)]
    pub audio_br: Option<String>,

    #[serde(default)]
    pub video_br: Option<String>,

    #[serde(default)]
    pub max_audio_br: Option<u32>,

    #[serde(default)]
    pub audio_codec: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MindConfig {
    #[serde(default = "default_mind_url")]
    pub url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

fn default_mind_url() -> String {
    "https://mind.tivo.com:8181".to_string()
}

impl Default for MindConfig {
    fn default() -> Self {
        Self {
            url: default_mind_url(),
            username: None,
            password: None,
        }
    }
}
