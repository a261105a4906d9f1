use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(MessageId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAuthor {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
}

impl MessageAuthor {
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawChatMessage")]
pub struct ChatMessage {
    pub id: MessageId,
    pub author_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<MessageAuthor>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawChatMessage {
    id: MessageId,
    #[serde(default)]
    author_name: Option<String>,
    #[serde(default)]
    author: Option<MessageAuthor>,
    text: String,
    created_at: DateTime<Utc>,
}

impl From<RawChatMessage> for ChatMessage {
    fn from(raw: RawChatMessage) -> Self {
        let author_name = raw
            .author_name
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                raw.author
                    .as_ref()
                    .map(|author| author.display_name().to_string())
            })
            .unwrap_or_default();
        Self {
            id: raw.id,
            author_name,
            author: raw.author,
            text: raw.text,
            created_at: raw.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl OnlineUser {
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(full_name) if !full_name.trim().is_empty() => full_name,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}
