//! # tubechat
//!
//! Client for assistant conversations tied to creator channels. Replies
//! stream in over Server-Sent Events and are reconciled into an ordered
//! message list as they arrive.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tubechat::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = Arc::new(HttpGateway::new(GatewayConfig::new("http://localhost:8000"))?);
//!
//!     let session = SessionCoordinator::new(gateway);
//!     session.start("UCKZozRVHRYsYHGEyNKuhhdA").await?;
//!
//!     let mut events = session.subscribe();
//!     session.submit("What is this channel about?");
//!
//!     while let Ok(event) = events.recv().await {
//!         if let SessionEvent::SendingEnded { .. } = event {
//!             break;
//!         }
//!     }
//!
//!     for message in session.messages() {
//!         println!("{}: {}", message.role.as_str(), message.content);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`tubechat-types`**: messages, channels, conversations, status normalization
//! - **`tubechat-client`**: `ConversationGateway` trait, HTTP gateway and SSE decoding
//! - **`tubechat-session`**: message store, stream reconciler, session coordinator

pub mod prelude;

pub use tubechat_types::{
    normalize_status, Channel, ChannelStatus, Conversation, ConversationId, Message,
    MessageRole, MessageStatus, Thumbnail, WireMessage, WireStatus, PLACEHOLDER_ID,
    WORKING_MARKER,
};

pub use tubechat_client::{
    decode_event_stream, ConversationGateway, EventStream, GatewayConfig, GatewayError,
    HttpGateway, SseDecoder, SseFrame,
};

pub use tubechat_session::{
    Applied, MessageStore, SessionCoordinator, SessionError, SessionEvent, SessionInitError,
    SessionState, StreamError, StreamHandle, StreamReconciler, Upserted,
};
