pub mod error;
pub mod traits;
pub mod config;
pub mod buffer_utils;
pub mod http;

pub use error::{GatewayError, Result};
pub use traits::{ConversationGateway, EventStream};
pub use config::GatewayConfig;
pub use buffer_utils::{decode_event_stream, CircularLineBuffer, SseDecoder, SseFrame};
pub use http::HttpGateway;
