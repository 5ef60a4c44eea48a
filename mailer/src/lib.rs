//! Transactional email through an external messaging tool.
//!
//! The tool is an MCP server exposing a `send-email` tool. `McpMailer` owns the
//! server process and speaks JSON-RPC 2.0 to it over stdio.

pub mod config;
pub mod mcp;

use async_trait::async_trait;

pub use config::McpConfig;
pub use mcp::McpMailer;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(thiserror::Error, Debug)]
pub enum MailerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON-RPC message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("messaging tool process has no stdio pipes")]
    MissingStdio,
    #[error("timed out connecting to the messaging tool")]
    ConnectTimeout,
    #[error("messaging tool closed the connection")]
    Closed,
    #[error("messaging tool returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("tool call failed: {0}")]
    ToolFailed(String),
}

/// Sends a single email. Implementations do not retry.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailerError>;

    /// Sender address attached to outgoing mail, if configured.
    fn sender(&self) -> Option<&str> {
        None
    }
}
