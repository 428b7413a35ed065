use anyhow::{bail, Result};

use analyst::client::AgentClient;
use analyst::conversation::{Conversation, TurnWriter};
use analyst::driver::{DriverState, StreamSummary, TurnSink};

use crate::prompt::{InputType, Prompt};

const PREVIEW_WIDTH: usize = 60;

pub struct Session<'a> {
    client: AgentClient,
    conversation: Conversation,
    prompt: Box<dyn Prompt + 'a>,
}

impl<'a> Session<'a> {
    pub fn new(client: AgentClient, prompt: Box<dyn Prompt + 'a>) -> Self {
        Session {
            client,
            conversation: Conversation::new(),
            prompt,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        self.prompt.analyst_ready();
        self.render_greeting();

        loop {
            let input = self.prompt.get_input()?;
            match input.input_type {
                InputType::Message => {
                    if let Some(content) = &input.content {
                        self.process(content).await;
                    }
                }
                InputType::Clear => {
                    self.conversation.clear();
                    self.prompt.notice("Conversation cleared.");
                    self.render_greeting();
                }
                InputType::AskAgain => continue,
                InputType::Exit => break,
            }
        }

        self.prompt.close();
        Ok(())
    }

    pub async fn headless_start(&mut self, message: &str) -> Result<()> {
        let summary = self.process(message).await;
        self.prompt.close();

        match summary {
            Some(summary) if summary.state == DriverState::Errored => {
                bail!("The agent did not produce a reply")
            }
            _ => Ok(()),
        }
    }

    fn render_greeting(&mut self) {
        if let Some(welcome) = self.conversation.turns().first() {
            let content = welcome.content.clone();
            self.prompt.render(&content);
        }
    }

    /// Send one message and render its reply. Ctrl+C while the reply streams stops it
    /// and starts the conversation over.
    async fn process(&mut self, text: &str) -> Option<StreamSummary> {
        let submission = match self.conversation.submit(text) {
            Ok(submission) => submission,
            Err(e) => {
                self.prompt.notice(&e.to_string());
                return None;
            }
        };

        self.prompt.show_busy();
        let cancel = submission.cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });

        let (summary, images) = {
            let mut sink = ProgressSink {
                writer: self.conversation.turn_sink(&submission.turn_id),
                prompt: &*self.prompt,
            };
            let summary = self.client.reply(&submission, &mut sink).await;
            (summary, sink.writer.into_images())
        };

        interrupt.abort();
        self.prompt.hide_busy();
        tracing::debug!(
            chunks = summary.chunks,
            frames = summary.frames,
            decode_errors = summary.decode_errors,
            salvaged = summary.salvaged,
            "Reply finished in state {:?}",
            summary.state
        );

        if summary.cancelled {
            self.conversation.clear();
            self.prompt
                .notice("Interrupted. The conversation has been cleared.");
            return Some(summary);
        }

        if let Some(turn) = self.conversation.turn(&submission.turn_id) {
            let content = turn.content.clone();
            self.prompt.render(&content);
        }
        for token in &images {
            match self.client.image_url(token) {
                Ok(url) => self.prompt.render_image(url.as_str()),
                Err(e) => tracing::warn!("Could not build a URL for image {}: {}", token, e),
            }
        }

        Some(summary)
    }
}

/// Writes the reply into the conversation and mirrors its progress on the spinner
struct ProgressSink<'s, 'p> {
    writer: TurnWriter<'s>,
    prompt: &'p dyn Prompt,
}

impl TurnSink for ProgressSink<'_, '_> {
    fn set_content(&mut self, content: &str) {
        self.writer.set_content(content);
        if let Some(line) = preview(content) {
            self.prompt.busy_message(&line);
        }
    }

    fn image_ready(&mut self, token: &str) {
        self.writer.image_ready(token);
        self.prompt.busy_message("image ready");
    }

    fn set_pending(&mut self, pending: bool) {
        self.writer.set_pending(pending);
    }
}

/// Last non-blank line of `content`, cut to fit beside the spinner
fn preview(content: &str) -> Option<String> {
    let line = content.lines().rev().map(str::trim).find(|l| !l.is_empty())?;
    if line.chars().count() <= PREVIEW_WIDTH {
        return Some(line.to_string());
    }
    let cut: String = line.chars().take(PREVIEW_WIDTH - 3).collect();
    Some(format!("{}...", cut))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_uses_last_line() {
        assert_eq!(
            preview("## Summary\nmean age is 41\n\n").as_deref(),
            Some("mean age is 41")
        );
        assert_eq!(preview("  \n "), None);
    }

    #[test]
    fn test_preview_truncates_long_lines() {
        let line = "é".repeat(100);
        let shown = preview(&line).unwrap();
        assert_eq!(shown.chars().count(), PREVIEW_WIDTH);
        assert!(shown.ends_with("..."));
    }
}
