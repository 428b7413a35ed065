use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use analyst::client::AgentClient;
use analyst::config::Settings;

mod prompt;
mod session;

use prompt::cliclack::CliclackPrompt;
use session::Session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the agent backend (can also be set via ANALYST_SERVER__BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Give up on a reply after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Send a single message, print the reply and exit
    #[arg(short, long)]
    message: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so they never interleave with rendered answers
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut settings = Settings::new().context("Failed to load configuration")?;
    if let Some(base_url) = cli.base_url {
        settings.server.base_url = base_url;
    }
    if let Some(timeout) = cli.timeout {
        settings.client.stream_timeout_secs = Some(timeout);
    }

    let client = AgentClient::new(settings).context("Failed to create the agent client")?;
    let mut session = Session::new(client, Box::new(CliclackPrompt::new()));

    match cli.message {
        Some(message) => session.headless_start(&message).await,
        None => session.start().await,
    }
}
