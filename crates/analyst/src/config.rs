use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;
use url::Url;

use crate::errors::{to_env_var, ConfigError};

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_stream_path")]
    pub stream_path: String,
    #[serde(default = "default_image_path")]
    pub image_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stream_path: default_stream_path(),
            image_path: default_image_path(),
        }
    }
}

impl ServerSettings {
    /// Absolute URL of a path on the backend
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }

    pub fn stream_url(&self) -> Result<Url, url::ParseError> {
        self.endpoint(&self.stream_path)
    }

    /// Absolute URL of a generated image, given the token from its directive
    pub fn image_url(&self, token: &str) -> Result<Url, url::ParseError> {
        self.endpoint(&format!(
            "{}/{}",
            self.image_path.trim_end_matches('/'),
            token
        ))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Upper bound on a whole reply, from sending the request to the end of the stream
    #[serde(default)]
    pub stream_timeout_secs: Option<u64>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            stream_timeout_secs: None,
        }
    }
}

impl ClientSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn stream_timeout(&self) -> Option<Duration> {
        self.stream_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub client: ClientSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.base_url", default_base_url())?
            .set_default("server.stream_path", default_stream_path())?
            .set_default("server.image_path", default_image_path())?
            .set_default("client.connect_timeout_secs", default_connect_timeout_secs())?
            .add_source(
                Environment::with_prefix("ANALYST")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8002".to_string()
}

fn default_stream_path() -> String {
    "/agent/stream".to_string()
}

fn default_image_path() -> String {
    "/static/images".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}
