//! Tivoshare-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across tivoshare:
//!
//! - **Device serials**: the [`Tsn`] wrapper for TiVo service numbers
//! - **Path Utilities**: extension checks, titles, and share-relative paths
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use tivoshare_common::{Tsn, Error, Result};
//! use tivoshare_common::paths::part_path;
//!
//! let tsn = Tsn::from_header(Some("6520001802C0F2A"));
//! assert!(!tsn.is_unknown());
//!
//! assert_eq!(part_path("/media/Movies", "/media/Movies/x.mp4"), "/x.mp4");
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("container"))
//! }
//! ```

pub mod error;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
