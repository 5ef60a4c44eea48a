use mailer::McpConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Config field cannot be empty: {0}")]
    EmptyField(&'static str),

    #[error("Mailer command cannot be empty")]
    EmptyMailerCommand,
}

/// Relay configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for the dashboard-facing API
    #[serde(default)]
    pub listener: Listener,
    /// Service-level access to the Appwrite project holding connected projects
    pub appwrite: AppwriteConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    /// Messaging tool used for notifications. Without it the relay still
    /// serves deployments but sends no email.
    pub mailer: Option<McpConfig>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.appwrite.validate()?;

        if self.console.default_region.is_empty() {
            return Err(ValidationError::EmptyField("console.default_region"));
        }

        if self
            .mailer
            .as_ref()
            .is_some_and(|mailer| mailer.command.trim().is_empty())
        {
            return Err(ValidationError::EmptyMailerCommand);
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3001,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Appwrite project where connected projects are registered
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AppwriteConfig {
    /// REST endpoint, e.g. `https://cloud.appwrite.io/v1`
    pub endpoint: Url,
    pub project_id: String,
    /// Server key with `documents.read` scope
    pub api_key: String,
    pub database_id: String,
    pub collection_id: String,
}

impl AppwriteConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("appwrite.project_id", &self.project_id),
            ("appwrite.api_key", &self.api_key),
            ("appwrite.database_id", &self.database_id),
            ("appwrite.collection_id", &self.collection_id),
        ] {
            if value.is_empty() {
                return Err(ValidationError::EmptyField(name));
            }
        }
        Ok(())
    }
}

fn default_console_base_url() -> String {
    "https://cloud.appwrite.io/console".into()
}

fn default_region() -> String {
    "fra".into()
}

/// Where notification emails link to.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ConsoleConfig {
    #[serde(default = "default_console_base_url")]
    pub base_url: String,
    /// Used when a connected project does not record its region
    #[serde(default = "default_region")]
    pub default_region: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        ConsoleConfig {
            base_url: default_console_base_url(),
            default_region: default_region(),
        }
    }
}
