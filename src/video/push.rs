//! `Push`: offer a file to a device through the mind service.

use super::{failure_reply, resolve_single_item, VideoShare};
use crate::error::{Error, Result};
use crate::mind::PushRequest;
use crate::protocol::{Reply, TivoQuery};
use crate::render::quote;
use std::io;
use std::net::IpAddr;
use tokio::net::UdpSocket;

impl VideoShare {
    /// Assemble the mind request for a `Push` command.
    ///
    /// The `tsn` parameter may name the device instead of giving its serial.
    pub async fn prepare_push(&self, query: &TivoQuery) -> Result<PushRequest> {
        let file = query
            .file
            .as_deref()
            .ok_or_else(|| Error::not_found("Push without File"))?;
        let raw = query.target.as_deref().unwrap_or_default();
        let tsn = self.devices.reverse_lookup(raw);

        let path = self.item_path(&query.container, file)?;

        // Probing and sidecar reads block; keep them off the runtime workers.
        let classifier = self.classifier.clone();
        let resolver = self.resolver.clone();
        let item_tsn = tsn.clone();
        let mut details = tokio::task::spawn_blocking(move || {
            resolve_single_item(&classifier, &resolver, &path, &item_tsn)
        })
        .await??;

        let ip = local_address(&self.config.server.push_probe_host).await?;
        let url = format!(
            "http://{}:{}/{}{}",
            ip,
            self.config.port(),
            quote(query.share_name()),
            quote(file)
        );

        let series_title = details.text("seriesTitle");
        let title = if series_title.is_empty() {
            details.text("title")
        } else {
            series_title
        };

        Ok(PushRequest {
            url,
            description: details.text("description"),
            duration_secs: details.get("duration").as_number().unwrap_or(0) / 1000,
            size: details.get("size").as_number().unwrap_or(0),
            title,
            subtitle: details.text("episodeTitle"),
            tsn,
        })
    }

    /// Handle `Push`: deliver the file, then send the client back where it
    /// came from.
    pub async fn push(&self, query: &TivoQuery) -> Reply {
        let result = match self.prepare_push(query).await {
            Ok(request) => self
                .mind
                .push_video(&request)
                .await
                .map(|()| request)
                .map_err(Error::Push),
            Err(err) => Err(err),
        };

        match result {
            Ok(request) => {
                tracing::info!(tsn = %request.tsn, url = %request.url, "Push accepted");
                Reply::Redirect(query.referer.clone().unwrap_or_else(|| "/".to_string()))
            }
            Err(err) => failure_reply("Push", err),
        }
    }
}

/// Local address used to reach the outside world.
///
/// Connecting a UDP socket sends nothing; it only selects the route.
pub async fn local_address(probe_host: &str) -> io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(probe_host).await?;
    Ok(socket.local_addr()?.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_address_loopback() {
        let ip = local_address("127.0.0.1:9").await.unwrap();
        assert!(ip.is_loopback());
    }
}
