use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::status::{normalize_status, MessageStatus, WireStatus};

/// Reserved id of the assistant message shown before the stream names it
pub const PLACEHOLDER_ID: &str = "initial";

/// Provisional content of the assistant placeholder
pub const WORKING_MARKER: &str = "Thinking...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    /// Case-insensitive parse of a wire role (`USER`, `MessageRole.ASSISTANT`)
    pub fn from_wire(raw: &str) -> Option<Self> {
        let unqualified = raw.rsplit('.').next().unwrap_or(raw);
        match unqualified.trim().to_ascii_lowercase().as_str() {
            "user" | "human" => Some(MessageRole::User),
            "assistant" | "ai" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for MessageRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        MessageRole::from_wire(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown message role: {raw}")))
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub role: MessageRole,
    #[serde(rename = "channelId", alias = "channel_id")]
    pub channel_id: String,
    #[serde(rename = "createdAt", alias = "created_at")]
    pub created_at: DateTime<Utc>,
    pub status: MessageStatus,
}

impl Message {
    /// User message with a freshly generated local id
    pub fn user(channel_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            role: MessageRole::User,
            channel_id: channel_id.into(),
            created_at: Utc::now(),
            status: MessageStatus::InProgress,
        }
    }

    /// Assistant placeholder awaiting the first streamed event
    pub fn placeholder(channel_id: impl Into<String>) -> Self {
        Self {
            id: PLACEHOLDER_ID.to_string(),
            content: WORKING_MARKER.to_string(),
            role: MessageRole::Assistant,
            channel_id: channel_id.into(),
            created_at: Utc::now(),
            status: MessageStatus::InProgress,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == PLACEHOLDER_ID
    }
}

/// Message-shaped record as the backend sends it, before normalization.
///
/// Every field is optional on the wire; [`WireMessage::into_message`] fills
/// the gaps from session context.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, rename = "channelId", alias = "channel_id")]
    pub channel_id: Option<String>,
    #[serde(
        default,
        rename = "createdAt",
        alias = "created_at",
        deserialize_with = "lenient_timestamp"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
}

impl WireMessage {
    pub fn parse(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }

    /// Normalized status; a missing status counts as `in_progress`
    pub fn wire_status(&self) -> WireStatus {
        match self.status.as_deref() {
            Some(raw) => normalize_status(raw),
            None => WireStatus::Known(MessageStatus::InProgress),
        }
    }

    /// Build a [`Message`], using `fallback_id` when the record carries no id.
    ///
    /// Unknown statuses are displayed as `in_progress`; the caller gets the
    /// raw [`WireStatus`] back to report it.
    pub fn into_message(self, channel_id: &str, fallback_id: &str) -> (Message, WireStatus) {
        let wire_status = self.wire_status();
        let status = wire_status.known().unwrap_or(MessageStatus::InProgress);

        let message = Message {
            id: self.id.unwrap_or_else(|| fallback_id.to_string()),
            content: self.content.unwrap_or_default(),
            role: self
                .role
                .as_deref()
                .and_then(MessageRole::from_wire)
                .unwrap_or(MessageRole::Assistant),
            channel_id: self.channel_id.unwrap_or_else(|| channel_id.to_string()),
            created_at: self.created_at.unwrap_or_else(Utc::now),
            status,
        };

        (message, wire_status)
    }
}

/// Accepts RFC 3339 as well as naive timestamps (`T` or space separated,
/// read as UTC). Anything unparseable becomes `None` rather than failing the
/// whole record.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_has_fresh_id() {
        let a = Message::user("chan", "hi");
        let b = Message::user("chan", "hi");

        assert_ne!(a.id, b.id);
        assert_eq!(a.role, MessageRole::User);
        assert_eq!(a.status, MessageStatus::InProgress);
        assert!(!a.is_placeholder());
    }

    #[test]
    fn test_placeholder() {
        let msg = Message::placeholder("chan");

        assert!(msg.is_placeholder());
        assert_eq!(msg.content, WORKING_MARKER);
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.status, MessageStatus::InProgress);
    }

    #[test]
    fn test_role_is_case_insensitive() {
        let role: MessageRole = serde_json::from_str("\"ASSISTANT\"").unwrap();
        assert_eq!(role, MessageRole::Assistant);

        let role: MessageRole = serde_json::from_str("\"MessageRole.USER\"").unwrap();
        assert_eq!(role, MessageRole::User);
    }

    #[test]
    fn test_wire_message_fills_gaps() {
        let wire = WireMessage::parse(r#"{"content":"Hel","status":"IN_PROGRESS"}"#).unwrap();
        let (msg, status) = wire.into_message("chan", "last-id");

        assert_eq!(msg.id, "last-id");
        assert_eq!(msg.channel_id, "chan");
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(status, WireStatus::Known(MessageStatus::InProgress));
    }

    #[test]
    fn test_wire_message_ignores_backend_extras() {
        let payload = r#"{
            "id": "abc",
            "role": "assistant",
            "content": "Hello!",
            "additional_kwargs": {},
            "status": "COMPLETED",
            "status_reason": null,
            "created_at": "2024-01-01T10:00:00Z"
        }"#;
        let (msg, _) = WireMessage::parse(payload).unwrap().into_message("chan", "initial");

        assert_eq!(msg.id, "abc");
        assert_eq!(msg.status, MessageStatus::Completed);
        assert_eq!(msg.created_at.to_rfc3339(), "2024-01-01T10:00:00+00:00");
    }

    #[test]
    fn test_naive_timestamps_are_read_as_utc() {
        let wire = WireMessage::parse(r#"{"id":"a","created_at":"2024-03-05 08:09:10.250000"}"#)
            .unwrap();
        let created = wire.created_at.unwrap();
        assert_eq!(created.to_rfc3339(), "2024-03-05T08:09:10.250+00:00");

        let wire = WireMessage::parse(r#"{"id":"a","created_at":"yesterday"}"#).unwrap();
        assert!(wire.created_at.is_none());
    }

    #[test]
    fn test_unknown_role_defaults_to_assistant() {
        let wire = WireMessage::parse(r#"{"id":"a","role":"system"}"#).unwrap();
        let (msg, _) = wire.into_message("chan", "initial");
        assert_eq!(msg.role, MessageRole::Assistant);
    }

    #[test]
    fn test_unknown_status_displays_in_progress() {
        let wire = WireMessage::parse(r#"{"id":"x","status":"weird"}"#).unwrap();
        let (msg, status) = wire.into_message("chan", "initial");

        assert_eq!(msg.status, MessageStatus::InProgress);
        assert_eq!(status, WireStatus::Unknown("weird".to_string()));
    }
}
