//! # tivoshare-av
//!
//! Video probing and MPEG-2 transcoding for TiVo receivers.
//!
//! This crate provides functionality for:
//! - Probing video files with ffprobe to extract stream metadata
//! - Memoizing probe results in a concurrent [`InfoCache`]
//! - Deciding whether a file can be streamed to a device unmodified
//! - Choosing the video bitrate and planning the ffmpeg transcode
//! - Spawning ffmpeg and streaming the transcoded program stream
//!
//! ## Features
//!
//! - `tracing` - Enable tracing support
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tivoshare_av::{DeviceProfile, FfmpegTranscoder, InfoCache, Transcoder};
//!
//! let transcoder = FfmpegTranscoder::new(Arc::new(InfoCache::new()));
//! let profile = DeviceProfile::default();
//! let verdict = transcoder.tivo_compatible("/path/to/show.mpg".as_ref(), &profile)?;
//! println!("{}", verdict.reason);
//! # Ok::<(), tivoshare_av::Error>(())
//! ```

pub mod cache;
pub mod compat;
mod error;
pub mod probe;
pub mod profile;
pub mod tools;
pub mod transcode;
pub mod transcoder;

// Re-exports
pub use cache::{InfoCache, ProbeCache};
pub use compat::Compatibility;
pub use error::{Error, Result};
pub use probe::{AudioStream, VideoInfo, VideoStream};
pub use profile::DeviceProfile;
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
pub use transcode::TranscodePlan;
pub use transcoder::{FfmpegTranscoder, Transcoder};
