use serde::{Deserialize, Serialize};

/// Author of a backend message, as carried in its `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Ai,
    Tool,
    #[default]
    #[serde(other)]
    Other,
}

/// Author of a conversation turn on the client side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::Human,
            TurnRole::Assistant => Role::Ai,
        }
    }
}
