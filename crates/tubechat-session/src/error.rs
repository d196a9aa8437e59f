use thiserror::Error;
use tubechat_client::GatewayError;

use crate::events::SessionState;

/// Failure while establishing a session; leaves the coordinator `Failed`
#[derive(Error, Debug)]
pub enum SessionInitError {
    #[error("Failed to fetch channel: {0}")]
    Channel(#[source] GatewayError),

    #[error("Channel {0} is not active")]
    ChannelInactive(String),

    #[error("Failed to resolve conversation: {0}")]
    Conversation(#[source] GatewayError),

    #[error("Failed to fetch history: {0}")]
    History(#[source] GatewayError),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Init(#[from] SessionInitError),

    #[error("Session is {0}, expected ready")]
    NotReady(SessionState),

    #[error("A message is still being answered")]
    SendInFlight,

    #[error("Session already started")]
    AlreadyStarted,

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

/// Stream-level problems. Recovered locally and reported through
/// `tracing` and [`crate::SessionEvent`], never returned to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("Stream protocol error: {detail}")]
    Protocol { detail: String },

    #[error("Stream transport error: {detail}")]
    Transport { detail: String },
}

impl StreamError {
    pub fn protocol(detail: impl Into<String>) -> Self {
        StreamError::Protocol {
            detail: detail.into(),
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        StreamError::Transport {
            detail: detail.into(),
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            StreamError::Protocol { detail } | StreamError::Transport { detail } => detail,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
