//! The per-entry descriptor map.
//!
//! [`VideoDetails`] never reports a missing key: reading an absent key
//! synthesizes its default, stores it, and returns it. Keys starting with the
//! multi-valued marker default to an empty list, a fixed table of protocol
//! fields has explicit defaults, and everything else defaults to an empty
//! string.

use std::collections::BTreeMap;
use std::fmt;

/// Prefix marking a multi-valued field (`vActor`, `vGenre`, `vHost`, ...).
pub const MULTI_VALUE_PREFIX: char = 'v';

/// One value in a descriptor map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailValue {
    Text(String),
    Number(u64),
    Flag(bool),
    List(Vec<String>),
    /// Enumerated field: display code and numeric id, e.g. `("NR", "7")`.
    Coded { code: String, id: String },
}

impl DetailValue {
    fn coded(code: &str, id: &str) -> Self {
        Self::Coded {
            code: code.to_string(),
            id: id.to_string(),
        }
    }

    pub fn as_list(&self) -> &[String] {
        match self {
            Self::List(items) => items,
            _ => &[],
        }
    }

    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> bool {
        match self {
            Self::Flag(b) => *b,
            Self::Text(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for DetailValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Flag(b) => write!(f, "{b}"),
            Self::List(items) => f.write_str(&items.join(", ")),
            Self::Coded { code, .. } => f.write_str(code),
        }
    }
}

impl From<String> for DetailValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for DetailValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<u64> for DetailValue {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for DetailValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<Vec<String>> for DetailValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Default synthesized for a key that has never been set.
pub fn default_for(key: &str) -> DetailValue {
    match key {
        "showingBits" | "episodeNumber" | "displayMajorNumber" | "displayMinorNumber" => {
            DetailValue::from("0")
        }
        "isEpisode" => DetailValue::from("true"),
        "colorCode" => DetailValue::coded("COLOR", "4"),
        "showType" => DetailValue::coded("SERIES", "5"),
        "tvRating" => DetailValue::coded("NR", "7"),
        _ if key.starts_with(MULTI_VALUE_PREFIX) => DetailValue::List(Vec::new()),
        _ => DetailValue::Text(String::new()),
    }
}

/// Self-completing descriptor map for one listed or queried file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoDetails {
    values: BTreeMap<String, DetailValue>,
}

impl VideoDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, materializing its default on first read.
    pub fn get(&mut self, key: &str) -> &DetailValue {
        self.values
            .entry(key.to_string())
            .or_insert_with(|| default_for(key))
    }

    /// Value for `key` rendered as text.
    pub fn text(&mut self, key: &str) -> String {
        self.get(key).to_string()
    }

    /// Items of a multi-valued field; empty for any other kind of value.
    pub fn list(&mut self, key: &str) -> Vec<String> {
        self.get(key).as_list().to_vec()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<DetailValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Every key is reported present; see [`keys`](Self::keys) for the keys
    /// actually materialized.
    pub fn contains(&self, _key: &str) -> bool {
        true
    }

    /// Keys materialized so far, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Overlay `other` on top of this map, replacing existing keys.
    pub fn update(&mut self, other: VideoDetails) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Extend<(String, DetailValue)> for VideoDetails {
    fn extend<T: IntoIterator<Item = (String, DetailValue)>>(&mut self, iter: T) {
        self.values.extend(iter);
    }
}
