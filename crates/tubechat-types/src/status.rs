use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Lifecycle status of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    InProgress,
    Completed,
    Rejected,
    Regenerated,
    Failed,
}

impl MessageStatus {
    pub const ALL: [MessageStatus; 5] = [
        MessageStatus::InProgress,
        MessageStatus::Completed,
        MessageStatus::Rejected,
        MessageStatus::Regenerated,
        MessageStatus::Failed,
    ];

    /// `completed` and `failed` end an in-flight stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Completed | MessageStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::InProgress => "in_progress",
            MessageStatus::Completed => "completed",
            MessageStatus::Rejected => "rejected",
            MessageStatus::Regenerated => "regenerated",
            MessageStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MessageStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match normalize_status(&raw) {
            WireStatus::Known(status) => Ok(status),
            WireStatus::Unknown(other) => Err(serde::de::Error::custom(format!(
                "unknown message status: {other}"
            ))),
        }
    }
}

/// Result of mapping an inbound status string onto the canonical set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireStatus {
    Known(MessageStatus),
    Unknown(String),
}

impl WireStatus {
    pub fn known(&self) -> Option<MessageStatus> {
        match self {
            WireStatus::Known(status) => Some(*status),
            WireStatus::Unknown(_) => None,
        }
    }
}

/// Total mapping from wire status strings to [`MessageStatus`].
///
/// Accepts the canonical values (`in_progress`), enum names (`IN_PROGRESS`),
/// qualified enum names (`ChatResponseStatusEnum.IN_PROGRESS`) and the usual
/// case/separator variants (`In-Progress`, `InProgress`). Anything else maps
/// to [`WireStatus::Unknown`]; this function never fails.
pub fn normalize_status(raw: &str) -> WireStatus {
    let trimmed = raw.trim();
    let unqualified = trimmed.rsplit('.').next().unwrap_or(trimmed);

    let folded: String = unqualified
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let status = match folded.as_str() {
        "inprogress" => MessageStatus::InProgress,
        "completed" => MessageStatus::Completed,
        "rejected" => MessageStatus::Rejected,
        // the backend enum spells it REGENRATED
        "regenerated" | "regenrated" => MessageStatus::Regenerated,
        "failed" => MessageStatus::Failed,
        _ => return WireStatus::Unknown(trimmed.to_string()),
    };

    WireStatus::Known(status)
}
