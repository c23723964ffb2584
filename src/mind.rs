//! Client for the remote TiVo "mind" service that delivers pushed videos.

use crate::config::MindConfig;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use tivoshare_common::Tsn;
use xmltree::{Element, EmitterConfig, XMLNode};

/// Connection timeout for mind requests
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Partner id the mind expects on offers from PC-hosted shares.
const PARTNER_ID: &str = "tivo:pt.3187";
/// Name this share registers itself under.
const PC_BODY_NAME: &str = "tivoshare";

/// Everything the mind needs to offer one video to a device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushRequest {
    pub tsn: Tsn,
    /// URL the device downloads the video from.
    pub url: String,
    pub description: String,
    pub duration_secs: u64,
    pub size: u64,
    pub title: String,
    pub subtitle: String,
}

/// Remote delivery of pushed videos.
#[async_trait::async_trait]
pub trait Mind: Send + Sync {
    /// Offer the video to the device and subscribe the device to the offer.
    async fn push_video(&self, request: &PushRequest) -> Result<()>;
}

/// [`Mind`] talking to the TiVo mind service over HTTPS.
pub struct MindClient {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl MindClient {
    /// Build the client. The login session lives in the client's cookie
    /// store, so there is no fallback to a plain client.
    pub fn new(config: &MindConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECTION_TIMEOUT)
            .cookie_store(true)
            .build()
            .context("Failed to build HTTP client for mind")?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() => Ok((user, pass)),
            _ => bail!("mind credentials are not configured ([mind] username and password)"),
        }
    }

    async fn login(&self, username: &str, password: &str) -> Result<()> {
        let form = [
            ("cams_security_domain", "tivocom"),
            ("cams_login_config", "http"),
            ("cams_cb_username", username),
            ("cams_cb_password", password),
            ("cams_original_url", "/mind/mind7?type=infoGet"),
        ];
        let response = self
            .client
            .post(format!("{}/mind/login", self.base_url))
            .form(&form)
            .send()
            .await
            .context("Failed to log in to mind")?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            bail!("Mind login rejected: {}", error);
        }
        tracing::debug!(user = username, "Logged in to mind");
        Ok(())
    }

    async fn request(&self, request_type: &str, body: Element) -> Result<Element> {
        let payload = to_xml(&body)?;
        let response = self
            .client
            .post(format!("{}/mind/mind7?type={}", self.base_url, request_type))
            .header(reqwest::header::CONTENT_TYPE, "x-tivo/xml")
            .body(payload)
            .send()
            .await
            .with_context(|| format!("Failed to send {request_type}"))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("{} failed with {}: {}", request_type, status, text);
        }
        Element::parse(text.as_bytes())
            .with_context(|| format!("Invalid XML in {request_type} response"))
    }

    async fn pc_body_id(&self) -> Result<String> {
        let found = self.request("pcBodySearch", record("pcBodySearch", &[])).await?;
        if let Some(id) = found
            .get_child("pcBody")
            .and_then(|body| child_text(body, "pcBodyId"))
        {
            return Ok(id);
        }

        let stored = self
            .request(
                "pcBodyStore",
                record("pcBodyStore", &[("name", PC_BODY_NAME), ("lang", "en")]),
            )
            .await?;
        child_text(&stored, "pcBodyId").context("pcBodyStore response has no pcBodyId")
    }

    async fn offer(&self, request: &PushRequest, pc_body_id: &str) -> Result<String> {
        let body_id = format!("tsn:{}", request.tsn);
        let duration = request.duration_secs.to_string();
        let size = request.size.to_string();
        let published = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let fields = [
            ("bodyId", body_id.as_str()),
            ("description", request.description.as_str()),
            ("duration", duration.as_str()),
            ("encodingType", "mpeg2ProgramStream"),
            ("partnerId", PARTNER_ID),
            ("pcBodyId", pc_body_id),
            ("publishDate", published.as_str()),
            ("size", size.as_str()),
            ("source", PC_BODY_NAME),
            ("state", "complete"),
            ("subtitle", request.subtitle.as_str()),
            ("title", request.title.as_str()),
            ("url", request.url.as_str()),
        ];

        let offer = self
            .request("bodyOfferModify", record("bodyOfferModify", &fields))
            .await?;
        if offer.name != "bodyOffer" {
            bail!("Unexpected bodyOfferModify response: {}", offer.name);
        }
        child_text(&offer, "offerId").context("bodyOffer response has no offerId")
    }

    async fn subscribe(&self, tsn: &Tsn, offer_id: &str) -> Result<()> {
        let content_id = offer_id.replacen("tivo:of", "tivo:ct", 1);
        let body_id = format!("tsn:{tsn}");
        let mut subscribe = record(
            "subscribe",
            &[
                ("bodyId", body_id.as_str()),
                ("title", "pcBodySubscription"),
                ("uiType", "cds"),
            ],
        );
        subscribe.children.push(XMLNode::Element(record(
            "idSetSource",
            &[
                ("contentId", content_id.as_str()),
                ("offerId", offer_id),
                ("type", "singleOfferSource"),
            ],
        )));

        let result = self.request("subscribe", subscribe).await?;
        if result.name != "subscribeResult" {
            bail!("Unexpected subscribe response: {}", result.name);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Mind for MindClient {
    async fn push_video(&self, request: &PushRequest) -> Result<()> {
        let (username, password) = self.credentials()?;
        self.login(username, password).await?;

        let pc_body_id = self.pc_body_id().await?;
        let offer_id = self.offer(request, &pc_body_id).await?;
        self.subscribe(&request.tsn, &offer_id).await?;

        tracing::info!(tsn = %request.tsn, offer = %offer_id, title = %request.title, "Pushed video");
        Ok(())
    }
}

/// `<name><k1>v1</k1>...</name>`
fn record(name: &str, fields: &[(&str, &str)]) -> Element {
    let mut elem = Element::new(name);
    for (key, value) in fields {
        let mut child = Element::new(key);
        child.children.push(XMLNode::Text((*value).to_string()));
        elem.children.push(XMLNode::Element(child));
    }
    elem
}

fn child_text(elem: &Element, name: &str) -> Option<String> {
    elem.get_child(name)
        .and_then(|child| child.get_text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn to_xml(elem: &Element) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let config = EmitterConfig::new().write_document_declaration(false);
    elem.write_with_config(&mut buf, config)
        .context("Failed to serialize mind request")?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_fields_in_order() {
        let xml = to_xml(&record("pcBodyStore", &[("name", "tivoshare"), ("lang", "en")])).unwrap();
        let xml = String::from_utf8(xml).unwrap();
        assert_eq!(
            xml,
            "<pcBodyStore><name>tivoshare</name><lang>en</lang></pcBodyStore>"
        );
    }

    #[test]
    fn test_child_text() {
        let elem = Element::parse("<bodyOffer><offerId> tivo:of.123 </offerId><x/></bodyOffer>".as_bytes())
            .unwrap();
        assert_eq!(child_text(&elem, "offerId").as_deref(), Some("tivo:of.123"));
        assert_eq!(child_text(&elem, "x"), None);
        assert_eq!(child_text(&elem, "missing"), None);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_network() {
        let client = MindClient::new(&MindConfig {
            url: "http://127.0.0.1:1".to_string(),
            username: None,
            password: None,
        })
        .unwrap();
        let err = client
            .push_video(&PushRequest::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("credentials"));
    }

    #[test]
    fn test_new_keeps_session_settings() {
        let client = MindClient::new(&MindConfig {
            url: "https://mind.example.com:8181/".to_string(),
            username: Some("user@example.com".to_string()),
            password: Some("secret".to_string()),
        })
        .unwrap();
        assert_eq!(client.base_url, "https://mind.example.com:8181");
        assert_eq!(client.credentials().unwrap(), ("user@example.com", "secret"));
    }
}
