//! Prelude module for convenient imports
//!
//! ```rust
//! use tubechat::prelude::*;
//! ```

pub use crate::{
    Channel, ConversationGateway, ConversationId, GatewayConfig, GatewayError, HttpGateway,
    Message, MessageRole, MessageStatus, SessionCoordinator, SessionError, SessionEvent,
    SessionState,
};
