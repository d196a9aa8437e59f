// HTTP implementation of the conversation gateway (reqwest, no SDK)

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CACHE_CONTROL, CONTENT_TYPE, COOKIE};
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tubechat_types::{Channel, ConversationId, Message, WireMessage, WireStatus};
use url::Url;

use crate::buffer_utils::decode_event_stream;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::traits::{ConversationGateway, EventStream};

/// Gateway speaking the backend's JSON-over-POST API and SSE message stream
pub struct HttpGateway {
    http_client: reqwest::Client,
    base_url: Url,
    config: GatewayConfig,
}

impl HttpGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(cookie) = &config.cookie {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(cookie)
                    .map_err(|e| GatewayError::InvalidHeader(format!("cookie: {}", e)))?,
            );
        }

        // No overall timeout here: it would also cut long-lived streams
        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            config,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// `chat/{id}/message_stream?user_message=...`, with the id as one
    /// percent-encoded path segment
    fn stream_url(&self, conversation_id: &ConversationId, user_message: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::BaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["chat", conversation_id.as_str(), "message_stream"]);
        url.query_pairs_mut().append_pair("user_message", user_message);
        Ok(url)
    }

    async fn post_text(&self, path: &str, body: Value) -> Result<String> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "POST");

        let response = self
            .http_client
            .post(url)
            .timeout(self.config.timeout())
            .json(&body)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.text().await?)
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        let text = self.post_text(path, body).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ConversationGateway for HttpGateway {
    async fn resolve_conversation(&self, channel_id: &str) -> Result<Option<ConversationId>> {
        let body = self
            .post_text("chat/get_chat_id", json!({ "channel_id": channel_id }))
            .await?;
        parse_conversation_id(&body)
    }

    async fn create_conversation(&self, channel_id: &str) -> Result<ConversationId> {
        let body = self
            .post_text("chat/initiate", json!({ "channel_id": channel_id }))
            .await?;
        parse_conversation_id(&body)?
            .ok_or_else(|| GatewayError::MissingData("conversation id".to_string()))
    }

    async fn fetch_history(
        &self,
        channel_id: &str,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>> {
        let records: Option<Vec<WireMessage>> = self
            .post_json("chat/history", json!({ "chat_id": conversation_id.as_str() }))
            .await?;

        let messages = records
            .unwrap_or_default()
            .into_iter()
            .map(|record| {
                let fallback_id = uuid::Uuid::new_v4().to_string();
                let (message, status) = record.into_message(channel_id, &fallback_id);
                if let WireStatus::Unknown(raw) = status {
                    tracing::warn!(id = %message.id, status = %raw, "History record has unknown status");
                }
                message
            })
            .collect();

        Ok(messages)
    }

    async fn fetch_channel(&self, channel_id: &str) -> Result<Channel> {
        self.post_json("onboard/channel_details/", json!({ "channel_id": channel_id }))
            .await
    }

    async fn list_channels(&self) -> Result<Vec<Channel>> {
        let channels: Option<Vec<Channel>> = self.post_json("onboard/channels", json!({})).await?;
        Ok(channels.unwrap_or_default())
    }

    async fn open_message_stream(
        &self,
        conversation_id: &ConversationId,
        user_message: &str,
    ) -> Result<EventStream> {
        let url = self.stream_url(conversation_id, user_message)?;
        tracing::info!(conversation_id = %conversation_id, "Opening message stream");

        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(decode_event_stream(response.bytes_stream()))
    }
}

fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if url.cannot_be_a_base() {
        return Err(GatewayError::BaseUrl(raw.to_string()));
    }
    // Url::join replaces the last segment unless the path ends with '/'
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    tracing::error!(status, body = %body, "Backend request failed");
    Err(GatewayError::Status { status, body })
}

/// The backend answers with a JSON string, `null`, or an empty body
fn parse_conversation_id(body: &str) -> Result<Option<ConversationId>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let id: Option<String> = serde_json::from_str(trimmed)?;
    Ok(id
        .filter(|id| !id.trim().is_empty())
        .map(ConversationId::from))
}
