use thiserror::Error;

/// Failures that end a request. Surfaced to the user as a fixed failure message.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Server returned status {status}")]
    Status { status: u16 },

    #[error("No stream available in the response")]
    NoStream,

    #[error("Failed to read stream: {0}")]
    Read(String),

    #[error("Stream timed out")]
    Timeout,

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// A `data` frame whose payload is not valid JSON. Recoverable: the frame is skipped.
#[derive(Error, Debug)]
#[error("Malformed payload ({source}): {payload}")]
pub struct FrameDecodeError {
    #[source]
    pub source: serde_json::Error,
    pub payload: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("A reply is already in progress")]
    Busy,

    #[error("Message is empty")]
    EmptyInput,
}

pub type StreamResult<T> = Result<T, StreamError>;

/// Map a config key such as `server.base_url` to its environment variable.
pub fn to_env_var(field_path: &str) -> String {
    let mut env_var = String::from("ANALYST_");
    env_var.push_str(&field_path.to_uppercase().replace('.', "__"));
    env_var
}
