use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Guild id of the synthetic direct-messages pseudo-guild.
pub const DM_GUILD_ID: &str = "@me";

/// Platform entity identifier. Snowflakes arrive as strings on the wire and
/// are never interpreted numerically by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snowflake(pub String);

impl Snowflake {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_dm(&self) -> bool {
        self.0 == DM_GUILD_ID
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Snowflake {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub features: Vec<String>,
}

/// Gateway-provided sidebar folder. A folder with no id is a transparent
/// single-guild passthrough, not a real container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildFolder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    pub guild_ids: Vec<Snowflake>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DmChannel {
    pub id: Snowflake,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_id: Option<Snowflake>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Snowflake,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}
