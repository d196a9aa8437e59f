use serde::{Deserialize, Serialize};
use std::fmt;
use tubechat_types::{ConversationId, MessageStatus};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Sending,
    Resetting,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::Sending => "sending",
            SessionState::Resetting => "resetting",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change notifications broadcast to session observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The message list was modified; re-read it with `messages()`
    MessagesChanged,

    SendingStarted,

    /// The in-flight submission settled with this assistant status
    SendingEnded {
        status: MessageStatus,
    },

    /// An event was undecodable or carried an unknown status
    ProtocolError {
        detail: String,
    },

    /// The stream broke or ended before a terminal status
    TransportError {
        detail: String,
    },

    /// A fresh conversation replaced the previous one
    ConversationReset {
        id: ConversationId,
    },
}
