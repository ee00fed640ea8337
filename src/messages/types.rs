use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opening line shown in every new transcript
pub const GREETING: &str = "Hello! How can I help?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A single transcript entry. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    /// Set on bot replies that carry a classified failure instead of an answer
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            text: text.into(),
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Sender::Bot, text)
    }

    pub fn bot_error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(Sender::Bot, text)
        }
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}
