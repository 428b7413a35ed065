use anyhow::Result;

pub mod cliclack;

pub trait Prompt {
    /// Render a finished answer
    fn render(&mut self, content: &str);
    /// Point the user at a generated image
    fn render_image(&mut self, url: &str);
    /// Short status line, not part of the conversation
    fn notice(&mut self, message: &str);
    fn get_input(&mut self) -> Result<Input>;
    fn show_busy(&mut self);
    /// Update the busy indicator while a reply streams in
    fn busy_message(&self, message: &str);
    fn hide_busy(&mut self);
    fn close(&self);
    fn analyst_ready(&self) {
        println!("\n");
        println!("Analyst is ready! Ask a question about your dataset, or type /? for help.");
        println!("\n");
    }
}

pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // Only set for messages
}

#[derive(Debug, PartialEq, Eq)]
pub enum InputType {
    AskAgain, // Ask the user for input again. Control flow command.
    Message,  // User sent a message
    Clear,    // Start the conversation over
    Exit,     // User wants to exit the session
}

pub enum Theme {
    Light,
    Dark,
}

/// Interpret a line of user input
pub fn parse_input(text: &str) -> Input {
    let text = text.trim();
    let input_type = if text.eq_ignore_ascii_case("/exit") || text.eq_ignore_ascii_case("/quit")
    {
        InputType::Exit
    } else if text.eq_ignore_ascii_case("/clear") {
        InputType::Clear
    } else if text.is_empty() {
        InputType::AskAgain
    } else {
        return Input {
            input_type: InputType::Message,
            content: Some(text.to_string()),
        };
    };

    Input {
        input_type,
        content: None,
    }
}
