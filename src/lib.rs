//! tivoshare - TiVoConnect video share
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod devices;
pub mod error;
pub mod mind;
pub mod pager;
pub mod protocol;
pub mod render;
pub mod video;

pub use error::{Error, Result};
pub use protocol::{Reply, TivoQuery};
pub use video::VideoShare;
