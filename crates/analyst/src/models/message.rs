use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::role::Role;

/// A message as found in a streamed payload's message collection
///
/// Fields of the wrong shape are read as absent, so a malformed `type` or `tool_calls`
/// never hides valid text content.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AgentMessage {
    #[serde(rename = "type", default, deserialize_with = "lenient_role")]
    pub role: Role,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default, deserialize_with = "lenient_tool_calls")]
    pub tool_calls: Option<Vec<Value>>,
}

fn lenient_role<'de, D>(deserializer: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_tool_calls<'de, D>(deserializer: D) -> Result<Option<Vec<Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(calls) => Ok(Some(calls)),
        _ => Ok(None),
    }
}

impl AgentMessage {
    /// The content, when it is a string with something other than whitespace
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
    }

    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .is_some_and(|calls| !calls.is_empty())
    }
}

/// A prior or new turn as sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
}

impl RequestMessage {
    pub fn human<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn ai<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInput {
    pub messages: Vec<RequestMessage>,
}

/// Request body for the streaming endpoint: `{"input": {"messages": [...]}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub input: AgentInput,
}

impl AgentRequest {
    pub fn new(messages: Vec<RequestMessage>) -> Self {
        Self {
            input: AgentInput { messages },
        }
    }
}
