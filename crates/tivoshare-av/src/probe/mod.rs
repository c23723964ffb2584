//! Video file probing.
//!
//! Probing shells out to `ffprobe` and condenses its JSON report into a
//! [`VideoInfo`] describing the primary video and audio streams.

mod ffprobe;
mod types;

pub use ffprobe::probe_with_ffprobe;
pub use types::*;
