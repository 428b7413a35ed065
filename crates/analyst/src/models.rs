//! These models represent the objects exchanged with the agent backend
//!
//! There are two related formats we need to interact with:
//! - the request body, listing prior turns as `{type, content}` messages
//! - the streamed payloads, whose message collections hold backend messages
//!
//! Conversation turns are the client-side view that the decoder writes into.
pub mod message;
pub mod role;
pub mod turn;
