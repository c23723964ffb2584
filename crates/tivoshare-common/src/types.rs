//! Core types shared between the protocol layer and the transcoder.

use serde::{Deserialize, Serialize};

/// TiVo service number identifying the requesting device.
///
/// An empty serial means the request did not identify its device. Unknown
/// devices are treated as default, 16:9 capable receivers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tsn(String);

impl Tsn {
    /// Serial used when the request carries no `tsn` header.
    #[must_use]
    pub fn unknown() -> Self {
        Self(String::new())
    }

    /// Build a serial from an optional header value.
    ///
    /// Surrounding whitespace is trimmed; a missing or blank header yields
    /// [`Tsn::unknown`].
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .map(|v| Self(v.trim().to_string()))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0.is_empty()
    }

    /// First `len` characters of the serial, which encode the hardware model.
    pub fn model_prefix(&self, len: usize) -> &str {
        match self.0.char_indices().nth(len) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl From<&str> for Tsn {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Tsn {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Tsn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
