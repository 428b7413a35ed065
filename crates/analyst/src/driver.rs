use std::fmt::Display;

use futures::{Stream, StreamExt};
use tokio::time::{timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::decoder::merge::{AnswerState, Directive, MergeOutcome};
use crate::decoder::{parse_frame, reduce, salvage_frames, FrameSplitter, ParsedEvent};
use crate::errors::StreamError;

/// Replaces the pending turn's content when the request fails
pub const FAILURE_MESSAGE: &str =
    "Sorry, something went wrong while calling the analysis assistant. Please check that the backend service is running.";

/// Visible state owned by the front end
///
/// The driver only ever writes to the single turn it was started for.
pub trait TurnSink {
    /// Replace the content of the pending assistant turn
    fn set_content(&mut self, content: &str);

    /// An image directive was found; `token` is the generated file name
    fn image_ready(&mut self, token: &str);

    fn set_pending(&mut self, pending: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Reading,
    Dispatching,
    Draining,
    Done,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub state: DriverState,
    pub answer: String,
    pub chunks: usize,
    pub frames: usize,
    pub decode_errors: usize,
    pub salvaged: usize,
    pub cancelled: bool,
}

/// Drives one response stream from first byte to completion.
///
/// A driver is created per request and owns that request's buffer and answer. Nothing
/// it holds outlives the request.
pub struct StreamDriver {
    state: DriverState,
    splitter: FrameSplitter,
    answer: AnswerState,
    cancel: CancellationToken,
    deadline: Option<Instant>,
    chunks: usize,
    frames: usize,
    decode_errors: usize,
    salvaged: usize,
}

impl StreamDriver {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            state: DriverState::Idle,
            splitter: FrameSplitter::new(),
            answer: AnswerState::new(),
            cancel,
            deadline: None,
            chunks: 0,
            frames: 0,
            decode_errors: 0,
            salvaged: 0,
        }
    }

    /// Fail the stream with [`StreamError::Timeout`] if it is still open at `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn answer(&self) -> &str {
        self.answer.answer()
    }

    /// Mark the request as pending. Called before the request is sent.
    pub fn start<T: TurnSink + ?Sized>(&mut self, sink: &mut T) {
        self.state = DriverState::Reading;
        if !self.cancel.is_cancelled() {
            sink.set_pending(true);
        }
    }

    /// Consume `body` until it ends, fails, times out or the request is cancelled.
    pub async fn run<S, B, E, T>(mut self, body: S, sink: &mut T) -> StreamSummary
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
        T: TurnSink + ?Sized,
    {
        if self.state == DriverState::Idle {
            self.start(sink);
        }

        futures::pin_mut!(body);
        let cancel = self.cancel.clone();
        let deadline = self.deadline;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(chunks = self.chunks, "stream cancelled, discarding the rest");
                    return self.summary();
                }
                next = next_chunk(&mut body, deadline) => next,
            };

            match next {
                Ok(Some(Ok(chunk))) => self.feed(chunk.as_ref(), sink),
                Ok(Some(Err(e))) => return self.fail(StreamError::Read(e.to_string()), sink),
                Ok(None) => break,
                Err(e) => return self.fail(e, sink),
            }
        }

        self.drain(sink);
        self.finish(sink)
    }

    /// Push one chunk through splitting, parsing, reduction and merging.
    pub fn feed<T: TurnSink + ?Sized>(&mut self, chunk: &[u8], sink: &mut T) {
        self.chunks += 1;
        let frames = self.splitter.push_bytes(chunk);
        debug!(
            chunk = self.chunks,
            len = chunk.len(),
            frames = frames.len(),
            buffered = self.splitter.remainder().len(),
            "received chunk"
        );

        self.state = DriverState::Dispatching;
        for frame in &frames {
            let event = parse_frame(frame);
            self.frames += 1;
            if event.is_end() {
                // Nothing after the end marker in this read matters
                debug!("end of stream marker");
                break;
            }
            self.dispatch(&event, sink);
        }
        self.state = DriverState::Reading;
    }

    /// Replay whatever the transport left in the buffer without a closing separator.
    pub fn drain<T: TurnSink + ?Sized>(&mut self, sink: &mut T) {
        self.state = DriverState::Draining;

        let leftover = self.splitter.take_remainder();
        if leftover.trim().is_empty() {
            return;
        }

        let events: Vec<ParsedEvent> = salvage_frames(&leftover)
            .iter()
            .map(|frame| parse_frame(frame))
            .filter(|event| event.is_data() && !event.payload.is_empty())
            .collect();

        if events.is_empty() {
            warn!(
                leftover_len = leftover.len(),
                "no recoverable payload in leftover buffer"
            );
            return;
        }

        debug!(count = events.len(), "replaying salvaged frames");
        for event in &events {
            self.salvaged += 1;
            self.dispatch(event, sink);
        }
    }

    /// End the request with a transport failure
    pub fn fail<T: TurnSink + ?Sized>(mut self, err: StreamError, sink: &mut T) -> StreamSummary {
        error!(error = %err, chunks = self.chunks, "agent stream failed");
        self.state = DriverState::Errored;
        if !self.cancel.is_cancelled() {
            sink.set_content(FAILURE_MESSAGE);
            sink.set_pending(false);
        }
        self.summary()
    }

    /// Give up on a request cancelled before its stream was opened
    pub fn abandon(self) -> StreamSummary {
        debug!("request cancelled before the stream opened");
        self.summary()
    }

    fn finish<T: TurnSink + ?Sized>(mut self, sink: &mut T) -> StreamSummary {
        self.state = DriverState::Done;
        if !self.cancel.is_cancelled() {
            sink.set_pending(false);
        }
        info!(
            chunks = self.chunks,
            frames = self.frames,
            decode_errors = self.decode_errors,
            salvaged = self.salvaged,
            "agent stream finished"
        );
        self.summary()
    }

    fn dispatch<T: TurnSink + ?Sized>(&mut self, event: &ParsedEvent, sink: &mut T) {
        match reduce(event) {
            Ok(reduction) => {
                let outcome = self.answer.apply(reduction);
                self.publish(outcome, sink);
            }
            Err(e) => {
                self.decode_errors += 1;
                warn!(error = %e, "skipping malformed frame");
            }
        }
    }

    fn publish<T: TurnSink + ?Sized>(&self, outcome: MergeOutcome, sink: &mut T) {
        if self.cancel.is_cancelled() {
            return;
        }
        if let Some(content) = outcome.visible {
            sink.set_content(&content);
        }
        if let Some(Directive::ImageReady { token }) = outcome.directive {
            debug!(token = %token, "image directive");
            sink.image_ready(&token);
        }
    }

    fn summary(&self) -> StreamSummary {
        StreamSummary {
            state: self.state,
            answer: self.answer.answer().to_string(),
            chunks: self.chunks,
            frames: self.frames,
            decode_errors: self.decode_errors,
            salvaged: self.salvaged,
            cancelled: self.cancel.is_cancelled(),
        }
    }
}

async fn next_chunk<S, T>(body: &mut S, deadline: Option<Instant>) -> Result<Option<T>, StreamError>
where
    S: Stream<Item = T> + Unpin,
{
    match deadline {
        Some(deadline) => timeout_at(deadline, body.next())
            .await
            .map_err(|_| StreamError::Timeout),
        None => Ok(body.next().await),
    }
}
