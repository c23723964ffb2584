//! Request parameters and replies of the TiVoConnect video commands.

use crate::pager::{resolve_anchor, PageRequest};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::path::Path;
use tivoshare_common::Tsn;

/// Outcome of a protocol command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// 200 with a `text/xml` body.
    Xml(Vec<u8>),
    /// 404 with an empty body.
    NotFound,
    /// 302 back to `location`.
    Redirect(String),
    /// 500 with a plain-text diagnostic body.
    ServerError(String),
}

impl Reply {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Xml(_) => StatusCode::OK,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Redirect(_) => StatusCode::FOUND,
            Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Xml(body) => (status, [(header::CONTENT_TYPE, "text/xml")], body).into_response(),
            Self::NotFound => status.into_response(),
            Self::Redirect(location) => (status, [(header::LOCATION, location)]).into_response(),
            Self::ServerError(body) => {
                (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
            }
        }
    }
}

/// Parameters of a `QueryContainer`, `TVBusQuery` or `Push` request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TivoQuery {
    /// `Container`: share name optionally followed by `/sub/path`.
    pub container: String,
    /// `File`: share-relative file path, starting with `/`.
    pub file: Option<String>,
    pub item_count: Option<i64>,
    pub anchor_item: Option<String>,
    pub anchor_offset: i64,
    /// `tsn` query parameter: push target, by serial or device name.
    pub target: Option<String>,
    /// `tsn` header of the requesting device.
    pub tsn: Tsn,
    /// `Referer` header.
    pub referer: Option<String>,
}

impl TivoQuery {
    pub fn container(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            ..Default::default()
        }
    }

    /// Parse a URL query string such as
    /// `Command=QueryContainer&Container=Movies%2FAction&ItemCount=8`.
    ///
    /// Unknown parameters are ignored; malformed numbers are treated as absent.
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = decode(value);
            match key {
                "Container" => parsed.container = value,
                "File" => parsed.file = Some(value),
                "ItemCount" => parsed.item_count = value.trim().parse().ok(),
                "AnchorItem" => parsed.anchor_item = Some(value),
                "AnchorOffset" => parsed.anchor_offset = value.trim().parse().unwrap_or(0),
                "tsn" => parsed.target = Some(value),
                _ => {}
            }
        }
        parsed
    }

    /// Parse the query string and the `tsn` and `Referer` headers of a request.
    pub fn from_request(uri: &Uri, headers: &HeaderMap) -> Self {
        let mut query = Self::parse(uri.query().unwrap_or_default());
        query.tsn = Tsn::from_header(headers.get("tsn").and_then(|v| v.to_str().ok()));
        query.referer = headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        query
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_tsn(mut self, tsn: impl Into<Tsn>) -> Self {
        self.tsn = tsn.into();
        self
    }

    /// Share name: the first segment of `Container`.
    pub fn share_name(&self) -> &str {
        self.container
            .split_once('/')
            .map_or(self.container.as_str(), |(share, _)| share)
    }

    /// Path below the share root, without leading separator.
    pub fn sub_path(&self) -> &str {
        self.container
            .split_once('/')
            .map_or("", |(_, rest)| rest.trim_matches('/'))
    }

    /// Window request with the anchor resolved against the share root.
    pub fn page_request(&self, share_root: &Path) -> PageRequest {
        PageRequest {
            item_count: self.item_count,
            anchor: self
                .anchor_item
                .as_deref()
                .map(|a| resolve_anchor(a, self.share_name(), share_root)),
            anchor_offset: self.anchor_offset,
        }
    }
}

fn decode(value: &str) -> String {
    let value = value.replace('+', " ");
    urlencoding::decode(&value)
        .map(|v| v.into_owned())
        .unwrap_or(value)
}
