use anyhow::Result;
use bytes::Bytes;
use futures::Stream;
use reqwest::Client;
use tokio::time::{timeout_at, Instant};
use tracing::info;
use url::Url;

use crate::config::Settings;
use crate::conversation::Submission;
use crate::driver::{StreamDriver, StreamSummary, TurnSink};
use crate::errors::{StreamError, StreamResult};
use crate::models::message::AgentRequest;

/// HTTP client for the agent's streaming endpoint
pub struct AgentClient {
    client: Client,
    settings: Settings,
    stream_url: Url,
}

impl AgentClient {
    pub fn new(settings: Settings) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(settings.client.connect_timeout())
            .build()?;
        let stream_url = settings.server.stream_url()?;

        Ok(Self {
            client,
            settings,
            stream_url,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Where a generated image can be fetched, given its directive token
    pub fn image_url(&self, token: &str) -> StreamResult<Url> {
        Ok(self.settings.server.image_url(token)?)
    }

    /// Send the request and hand back the response body as a byte stream
    pub async fn open_stream(
        &self,
        request: &AgentRequest,
    ) -> StreamResult<impl Stream<Item = reqwest::Result<Bytes>>> {
        info!(
            url = %self.stream_url,
            messages = request.input.messages.len(),
            "sending agent request"
        );

        let response = self
            .client
            .post(self.stream_url.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status {
                status: status.as_u16(),
            });
        }
        if response.content_length() == Some(0) {
            return Err(StreamError::NoStream);
        }

        Ok(response.bytes_stream())
    }

    /// Stream the reply to `submission` into `sink`, from sending the request to the
    /// end of the response.
    pub async fn reply<T: TurnSink + ?Sized>(
        &self,
        submission: &Submission,
        sink: &mut T,
    ) -> StreamSummary {
        let mut driver = StreamDriver::new(submission.cancel.clone());
        if let Some(timeout) = self.settings.client.stream_timeout() {
            driver = driver.with_deadline(Instant::now() + timeout);
        }
        driver.start(sink);

        let deadline = driver.deadline();
        let open = async {
            match deadline {
                Some(deadline) => timeout_at(deadline, self.open_stream(&submission.request))
                    .await
                    .unwrap_or(Err(StreamError::Timeout)),
                None => self.open_stream(&submission.request).await,
            }
        };

        let opened = tokio::select! {
            biased;
            _ = submission.cancel.cancelled() => return driver.abandon(),
            opened = open => opened,
        };

        match opened {
            Ok(body) => driver.run(body, sink).await,
            Err(e) => driver.fail(e, sink),
        }
    }
}
