use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use tubechat_types::{Channel, ConversationId, Message};

use crate::error::Result;

/// Push-event source: the `data` payload of each server-sent event, in
/// delivery order. Dropping the stream closes the underlying connection.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Boundary to the conversation backend
///
/// Implementations provide conversation lookup/creation, history retrieval,
/// channel metadata and the streaming message endpoint.
#[async_trait]
pub trait ConversationGateway: Send + Sync {
    /// Existing conversation for a channel, if any (idempotent)
    async fn resolve_conversation(&self, channel_id: &str) -> Result<Option<ConversationId>>;

    /// Always issues a fresh conversation id
    async fn create_conversation(&self, channel_id: &str) -> Result<ConversationId>;

    /// Full history snapshot, oldest first.
    ///
    /// `channel_id` stamps records that do not carry their own.
    async fn fetch_history(
        &self,
        channel_id: &str,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>>;

    /// Channel metadata for header rendering
    async fn fetch_channel(&self, channel_id: &str) -> Result<Channel>;

    /// All onboarded channels
    async fn list_channels(&self) -> Result<Vec<Channel>>;

    /// Open the server-push stream answering `user_message`
    async fn open_message_stream(
        &self,
        conversation_id: &ConversationId,
        user_message: &str,
    ) -> Result<EventStream>;
}
