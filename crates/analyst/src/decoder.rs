//! Incremental decoding of the agent's event stream
//!
//! Bytes flow one way through these stages:
//! - [`frame`] splits the stream into double-newline delimited frames and parses each one
//!   into an event type and a raw payload
//! - [`reducer`] decodes a `data` payload and classifies the latest backend message
//! - [`merge`] folds classified messages into the current answer and extracts directives
//! - [`salvage`] re-tokenizes whatever is left buffered when the transport closes
pub mod frame;
pub mod merge;
pub mod reducer;
pub mod salvage;

pub use frame::{parse_frame, FrameSplitter, ParsedEvent};
pub use merge::{AnswerState, Directive, MergeOutcome};
pub use reducer::{reduce, Reduction};
pub use salvage::salvage_frames;
