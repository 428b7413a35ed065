use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::TurnRole;

/// One entry of the visible conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: String,
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a new user turn with the current timestamp
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::new(TurnRole::User, content)
    }

    /// Create a new assistant turn with the current timestamp
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::new(TurnRole::Assistant, content)
    }

    fn new<S: Into<String>>(role: TurnRole, content: S) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}
