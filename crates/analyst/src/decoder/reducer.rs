use serde_json::Value;
use tracing::debug;

use super::frame::ParsedEvent;
use crate::errors::FrameDecodeError;
use crate::models::message::AgentMessage;
use crate::models::role::Role;

/// What one event contributes to the visible answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reduction {
    NoOp,
    /// A complete redraft of the answer, verbatim
    TextUpdate(String),
    /// The agent is calling a tool and has produced no text yet
    ToolInProgress,
    /// A tool finished; its output is kept for diagnostics only
    ToolResult(Option<String>),
}

type Locator = fn(&Value) -> Option<&Value>;

fn model_messages(payload: &Value) -> Option<&Value> {
    payload.get("model")?.get("messages")
}

fn top_level_messages(payload: &Value) -> Option<&Value> {
    payload.get("messages")
}

fn output_messages(payload: &Value) -> Option<&Value> {
    payload.get("output")?.get("messages")
}

/// Places a payload may keep its message collection, in priority order
const MESSAGE_LOCATORS: &[(&str, Locator)] = &[
    ("model.messages", model_messages),
    ("messages", top_level_messages),
    ("output.messages", output_messages),
];

/// Find the message collection, trying each known location in order
pub fn locate_messages(payload: &Value) -> Option<(&'static str, &Value)> {
    MESSAGE_LOCATORS.iter().find_map(|(path, locate)| {
        locate(payload)
            .filter(|messages| !messages.is_null())
            .map(|messages| (*path, messages))
    })
}

/// Reduce one parsed event.
///
/// Only `data` events with a payload carry anything. A payload that is not valid JSON is
/// reported as an error so the caller can log it and move on to the next frame.
pub fn reduce(event: &ParsedEvent) -> Result<Reduction, FrameDecodeError> {
    if !event.is_data() || event.payload.is_empty() {
        return Ok(Reduction::NoOp);
    }

    let payload: Value =
        serde_json::from_str(&event.payload).map_err(|source| FrameDecodeError {
            source,
            payload: event.payload.clone(),
        })?;

    Ok(reduce_payload(&payload))
}

/// Classify the latest message of a decoded payload
pub fn reduce_payload(payload: &Value) -> Reduction {
    let Some((path, messages)) = locate_messages(payload) else {
        debug!("payload has no message collection");
        return Reduction::NoOp;
    };

    // Earlier messages are history that has already been shown
    let Some(latest) = messages.as_array().and_then(|messages| messages.last()) else {
        debug!(path, "message collection is empty or not a list");
        return Reduction::NoOp;
    };

    match serde_json::from_value::<AgentMessage>(latest.clone()) {
        Ok(message) => classify(&message),
        Err(e) => {
            debug!(path, error = %e, "latest message is not a message object");
            Reduction::NoOp
        }
    }
}

pub fn classify(message: &AgentMessage) -> Reduction {
    if let Some(text) = message.text() {
        Reduction::TextUpdate(text.to_string())
    } else if message.has_tool_calls() {
        Reduction::ToolInProgress
    } else if message.role == Role::Tool {
        Reduction::ToolResult(
            message
                .content
                .as_ref()
                .and_then(Value::as_str)
                .map(String::from),
        )
    } else {
        Reduction::NoOp
    }
}
