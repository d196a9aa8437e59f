use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelStatus {
    #[serde(rename = "active", alias = "Active", alias = "ACTIVE")]
    Active,
    #[default]
    #[serde(rename = "inactive", alias = "Inactive", alias = "INACTIVE")]
    Inactive,
}

/// Creator channel a conversation is about (read-only on the client)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub thumbnails: Vec<Thumbnail>,
    #[serde(default, alias = "channel_status")]
    pub status: ChannelStatus,
}

impl Channel {
    pub fn is_active(&self) -> bool {
        self.status == ChannelStatus::Active
    }

    /// Largest thumbnail by area, if any
    pub fn best_thumbnail(&self) -> Option<&Thumbnail> {
        self.thumbnails
            .iter()
            .max_by_key(|t| u64::from(t.width) * u64::from(t.height))
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Thumbnail>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Thumbnail>>::deserialize(deserializer)?.unwrap_or_default())
}
