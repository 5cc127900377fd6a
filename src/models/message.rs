use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assessment::{Assessment, TurnPayload};
use super::enums::Sender;

/// Raw payload an assistant reply may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Attachment {
    Turn(TurnPayload),
    Assessment(Box<Assessment>),
}

/// One turn in the transcript. Appended only; never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sender", rename_all = "snake_case")]
pub enum Message {
    User {
        id: u64,
        text: String,
        created_at: DateTime<Utc>,
    },
    Assistant {
        id: u64,
        text: String,
        created_at: DateTime<Utc>,
        #[serde(default)]
        attachment: Option<Attachment>,
    },
}

impl Message {
    pub fn user(id: u64, text: impl Into<String>) -> Self {
        Self::User {
            id,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(id: u64, text: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self::Assistant {
            id,
            text: text.into(),
            created_at: Utc::now(),
            attachment,
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            Self::User { id, .. } | Self::Assistant { id, .. } => *id,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::User { text, .. } | Self::Assistant { text, .. } => text,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::User { created_at, .. } | Self::Assistant { created_at, .. } => *created_at,
        }
    }

    pub fn sender(&self) -> Sender {
        match self {
            Self::User { .. } => Sender::User,
            Self::Assistant { .. } => Sender::Assistant,
        }
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        match self {
            Self::User { .. } => None,
            Self::Assistant { attachment, .. } => attachment.as_ref(),
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }
}
