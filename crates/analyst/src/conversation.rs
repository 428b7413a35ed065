use tokio_util::sync::CancellationToken;

use crate::driver::TurnSink;
use crate::errors::ConversationError;
use crate::models::message::{AgentRequest, RequestMessage};
use crate::models::role::Role;
use crate::models::turn::ConversationTurn;

/// Greeting every conversation opens with. It is never sent back to the agent.
pub const WELCOME_MESSAGE: &str = "Hello! I'm your data analysis assistant. Upload a CSV dataset, choose the variables you are interested in, and I'll analyze them and suggest what to look at next.";

/// A user message that has been accepted and is waiting for its reply
#[derive(Debug, Clone)]
pub struct Submission {
    /// Id of the empty assistant turn the reply streams into
    pub turn_id: String,
    pub request: AgentRequest,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct PendingReply {
    turn_id: String,
    cancel: CancellationToken,
}

/// Ordered turns of one chat, with at most one reply in flight
#[derive(Debug)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
    welcome_id: String,
    pending: Option<PendingReply>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        let welcome = ConversationTurn::assistant(WELCOME_MESSAGE);
        Self {
            welcome_id: welcome.id.clone(),
            turns: vec![welcome],
            pending: None,
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn turn(&self, id: &str) -> Option<&ConversationTurn> {
        self.turns.iter().find(|turn| turn.id == id)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Prior turns as sent to the agent, without the greeting or blank turns
    pub fn history(&self) -> Vec<RequestMessage> {
        self.turns
            .iter()
            .filter(|turn| turn.id != self.welcome_id && !turn.is_blank())
            .map(|turn| RequestMessage {
                role: Role::from(turn.role),
                content: turn.content.clone(),
            })
            .collect()
    }

    /// Accept a user message and open an empty assistant turn for its reply
    pub fn submit(&mut self, text: &str) -> Result<Submission, ConversationError> {
        if text.trim().is_empty() {
            return Err(ConversationError::EmptyInput);
        }
        if self.pending.is_some() {
            return Err(ConversationError::Busy);
        }

        let mut messages = self.history();
        messages.push(RequestMessage::human(text));

        let assistant = ConversationTurn::assistant("");
        let turn_id = assistant.id.clone();
        self.turns.push(ConversationTurn::user(text));
        self.turns.push(assistant);

        let cancel = CancellationToken::new();
        self.pending = Some(PendingReply {
            turn_id: turn_id.clone(),
            cancel: cancel.clone(),
        });

        Ok(Submission {
            turn_id,
            request: AgentRequest::new(messages),
            cancel,
        })
    }

    /// Start over from the greeting. A reply still streaming is cancelled and its
    /// output discarded.
    pub fn clear(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
        }
        *self = Self::new();
    }

    /// A sink that writes the streamed reply into the given turn
    pub fn turn_sink(&mut self, turn_id: &str) -> TurnWriter<'_> {
        TurnWriter {
            conversation: self,
            turn_id: turn_id.to_string(),
            images: Vec::new(),
        }
    }

    fn set_turn_content(&mut self, turn_id: &str, content: &str) {
        if let Some(turn) = self.turns.iter_mut().find(|turn| turn.id == turn_id) {
            turn.content = content.to_string();
        }
    }

    fn finish(&mut self, turn_id: &str) {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.turn_id == turn_id)
        {
            self.pending = None;
        }
    }
}

/// Writes one streamed reply into its conversation turn
pub struct TurnWriter<'a> {
    conversation: &'a mut Conversation,
    turn_id: String,
    images: Vec<String>,
}

impl TurnWriter<'_> {
    /// Image tokens received so far, in order
    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn into_images(self) -> Vec<String> {
        self.images
    }
}

impl TurnSink for TurnWriter<'_> {
    fn set_content(&mut self, content: &str) {
        self.conversation.set_turn_content(&self.turn_id, content);
    }

    fn image_ready(&mut self, token: &str) {
        self.images.push(token.to_string());
    }

    fn set_pending(&mut self, pending: bool) {
        if !pending {
            self.conversation.finish(&self.turn_id);
        }
    }
}
