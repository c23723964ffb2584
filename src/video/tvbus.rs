//! `TVBusQuery`: the full descriptor of one file.

use super::details::VideoDetails;
use super::{failure_reply, VideoShare};
use crate::error::{Error, Result};
use crate::protocol::{Reply, TivoQuery};
use crate::render::render_tvbus;

/// Descriptor of a single queried file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TvBusItem {
    pub details: VideoDetails,
}

impl VideoShare {
    /// Resolve the file named by `query` at full tier.
    ///
    /// Items that are not eligible for listing are returned with
    /// `valid = false` and default fields.
    pub fn tvbus_item(&self, query: &TivoQuery) -> Result<TvBusItem> {
        let file = query
            .file
            .as_deref()
            .ok_or_else(|| Error::not_found("TVBusQuery without File"))?;
        let path = self.item_path(&query.container, file)?;
        let details = self.resolve_item(&path, &query.tsn)?;

        tracing::info!(path = %path.display(), tsn = %query.tsn, "Resolved item details");
        Ok(TvBusItem { details })
    }

    /// Handle `TVBusQuery`.
    pub fn tvbus_query(&self, query: &TivoQuery) -> Reply {
        match self
            .tvbus_item(query)
            .and_then(|mut item| render_tvbus(&mut item))
        {
            Ok(xml) => Reply::Xml(xml),
            Err(err) => failure_reply("TVBusQuery", err),
        }
    }
}
