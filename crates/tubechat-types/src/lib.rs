pub mod status;
pub mod message;
pub mod channel;
pub mod conversation;

pub use status::{normalize_status, MessageStatus, WireStatus};
pub use message::{Message, MessageRole, WireMessage, PLACEHOLDER_ID, WORKING_MARKER};
pub use channel::{Channel, ChannelStatus, Thumbnail};
pub use conversation::{Conversation, ConversationId};
