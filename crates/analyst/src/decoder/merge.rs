use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::reducer::Reduction;

/// Shown while the agent is calling tools and has not written any text yet
pub const WORKING_PLACEHOLDER: &str = "Analyzing...";

lazy_static! {
    static ref IMAGE_DIRECTIVE: Regex = Regex::new(r"IMAGE_GENERATED:\s*(\S+)").unwrap();
}

/// Out-of-band instruction embedded in the answer text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// A generated image is ready; the token is its file name
    ImageReady { token: String },
}

/// Find the first image marker in `text`
pub fn extract_directive(text: &str) -> Option<Directive> {
    IMAGE_DIRECTIVE
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|token| Directive::ImageReady {
            token: token.as_str().to_string(),
        })
}

/// Effect of one merge on what the user sees
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// New content for the pending turn, if it changes
    pub visible: Option<String>,
    pub directive: Option<Directive>,
}

/// The answer being built for one request, plus the last directive it fired
#[derive(Debug, Default)]
pub struct AnswerState {
    answer: String,
    last_fired: Option<String>,
}

impl AnswerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn apply(&mut self, reduction: Reduction) -> MergeOutcome {
        match reduction {
            Reduction::TextUpdate(text) => {
                // Each update is a full redraft, so it replaces rather than appends
                self.answer = text;
                MergeOutcome {
                    visible: Some(self.answer.clone()),
                    directive: self.scan_directive(),
                }
            }
            Reduction::ToolInProgress if self.answer.is_empty() => MergeOutcome {
                visible: Some(WORKING_PLACEHOLDER.to_string()),
                directive: None,
            },
            Reduction::ToolResult(output) => {
                debug!(
                    output_len = output.as_deref().map_or(0, str::len),
                    "tool finished"
                );
                MergeOutcome::default()
            }
            Reduction::ToolInProgress | Reduction::NoOp => MergeOutcome::default(),
        }
    }

    fn scan_directive(&mut self) -> Option<Directive> {
        let directive = extract_directive(&self.answer)?;
        let Directive::ImageReady { token } = &directive;
        if self.last_fired.as_deref() == Some(token.as_str()) {
            return None;
        }
        self.last_fired = Some(token.clone());
        Some(directive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(content: &str) -> Reduction {
        Reduction::TextUpdate(content.to_string())
    }

    fn image(token: &str) -> Option<Directive> {
        Some(Directive::ImageReady {
            token: token.to_string(),
        })
    }

    #[test]
    fn test_text_update_replaces_answer() {
        let mut state = AnswerState::new();
        state.apply(text("first draft"));
        let outcome = state.apply(text("second draft"));
        assert_eq!(state.answer(), "second draft");
        assert_eq!(outcome.visible.as_deref(), Some("second draft"));
    }

    #[test]
    fn test_repeated_snapshot_is_idempotent() {
        let mut state = AnswerState::new();
        let first = state.apply(text("same"));
        let second = state.apply(text("same"));
        assert_eq!(state.answer(), "same");
        assert_eq!(first.visible, second.visible);
    }

    #[test]
    fn test_tool_placeholder_only_before_text() {
        let mut state = AnswerState::new();
        let outcome = state.apply(Reduction::ToolInProgress);
        assert_eq!(outcome.visible.as_deref(), Some(WORKING_PLACEHOLDER));
        assert_eq!(state.answer(), "");

        state.apply(text("partial answer"));
        assert_eq!(state.apply(Reduction::ToolInProgress), MergeOutcome::default());
        assert_eq!(state.answer(), "partial answer");
    }

    #[test]
    fn test_tool_result_and_noop_change_nothing() {
        let mut state = AnswerState::new();
        state.apply(text("answer"));
        assert_eq!(
            state.apply(Reduction::ToolResult(Some("stdout".to_string()))),
            MergeOutcome::default()
        );
        assert_eq!(state.apply(Reduction::NoOp), MergeOutcome::default());
        assert_eq!(state.answer(), "answer");
    }

    #[test]
    fn test_directive_fires_once_per_token() {
        let mut state = AnswerState::new();
        let first = state.apply(text("Done. IMAGE_GENERATED:chart1.png"));
        assert_eq!(first.directive, image("chart1.png"));

        let repeat = state.apply(text("Done. IMAGE_GENERATED:chart1.png"));
        assert_eq!(repeat.directive, None);

        let redraft = state.apply(text("Here it is IMAGE_GENERATED:chart1.png (see panel)"));
        assert_eq!(redraft.directive, None);

        let next = state.apply(text("Updated IMAGE_GENERATED:chart2.png"));
        assert_eq!(next.directive, image("chart2.png"));
    }

    #[test]
    fn test_extract_directive() {
        assert_eq!(
            extract_directive("see IMAGE_GENERATED: plot_3.png\nnext line"),
            image("plot_3.png")
        );
        assert_eq!(
            extract_directive("IMAGE_GENERATED:a.png and IMAGE_GENERATED:b.png"),
            image("a.png")
        );
        assert_eq!(extract_directive("IMAGE_GENERATED:"), None);
        assert_eq!(extract_directive("no marker here"), None);
    }

    #[test]
    fn test_directive_token_on_next_line() {
        assert_eq!(
            extract_directive("Chart saved.\nIMAGE_GENERATED:\nx.png"),
            image("x.png")
        );
        assert_eq!(extract_directive("IMAGE_GENERATED:\t \n"), None);
    }
}
