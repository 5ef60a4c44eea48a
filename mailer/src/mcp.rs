//! Minimal MCP client: newline-delimited JSON-RPC 2.0 over a byte stream.
//!
//! Only the pieces needed to call a single tool are implemented: the
//! `initialize` handshake, the `notifications/initialized` notification and
//! `tools/call`. Exchanges are serialized behind one lock, so a response is
//! always read by the caller that sent the matching request.

use crate::{Email, Mailer, MailerError, McpConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;

const JSONRPC_VERSION: &str = "2.0";
const PROTOCOL_VERSION: &str = "2024-11-05";
const CLIENT_NAME: &str = "sendra-deployment-monitor";

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

/// Any inbound message. Responses carry `result` or `error`; server requests
/// and notifications carry `method`.
#[derive(Deserialize)]
struct RpcMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallResult {
    #[serde(default)]
    content: Vec<ToolContent>,
    #[serde(default)]
    is_error: bool,
}

#[derive(Deserialize)]
struct ToolContent {
    #[serde(default)]
    text: Option<String>,
}

impl ToolCallResult {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

struct Session {
    reader: Lines<BufReader<BoxedReader>>,
    writer: BoxedWriter,
    // Server process, if we spawned it. Killed when the session is dropped.
    _child: Option<Child>,
}

impl Session {
    async fn write_message(&mut self, message: &RpcRequest<'_>) -> Result<(), MailerError> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads until the response for `id` arrives, skipping anything else the
    /// server emits in between (log notifications, pings, stray output).
    async fn read_response(&mut self, id: u64) -> Result<Value, MailerError> {
        let expected_id = json!(id);

        loop {
            let line = self
                .reader
                .next_line()
                .await?
                .ok_or(MailerError::Closed)?;

            if line.trim().is_empty() {
                continue;
            }

            let message: RpcMessage = match serde_json::from_str(&line) {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring unparseable line from messaging tool");
                    continue;
                }
            };

            if message.method.is_some() || message.id.as_ref() != Some(&expected_id) {
                continue;
            }

            if let Some(error) = message.error {
                return Err(MailerError::Rpc {
                    code: error.code,
                    message: error.message,
                });
            }

            return Ok(message.result.unwrap_or(Value::Null));
        }
    }
}

pub struct McpMailer {
    session: Mutex<Session>,
    next_id: AtomicU64,
    tool_name: String,
    sender: Option<String>,
}

impl McpMailer {
    /// Spawns the configured MCP server and completes the handshake.
    pub async fn connect(config: &McpConfig) -> Result<Self, MailerError> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or(MailerError::MissingStdio)?;
        let stdout = child.stdout.take().ok_or(MailerError::MissingStdio)?;
        tracing::debug!(command = %config.command, "Spawned messaging tool process");

        Self::handshake(Box::new(stdout), Box::new(stdin), Some(child), config).await
    }

    /// Completes the handshake over an already established byte stream.
    pub async fn connect_io<R, W>(reader: R, writer: W, config: &McpConfig) -> Result<Self, MailerError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::handshake(Box::new(reader), Box::new(writer), None, config).await
    }

    async fn handshake(
        reader: BoxedReader,
        writer: BoxedWriter,
        child: Option<Child>,
        config: &McpConfig,
    ) -> Result<Self, MailerError> {
        let mailer = McpMailer {
            session: Mutex::new(Session {
                reader: BufReader::new(reader).lines(),
                writer,
                _child: child,
            }),
            next_id: AtomicU64::new(1),
            tool_name: config.tool_name.clone(),
            sender: config.sender.clone(),
        };

        timeout(config.connect_timeout(), mailer.initialize())
            .await
            .map_err(|_| MailerError::ConnectTimeout)??;

        Ok(mailer)
    }

    async fn initialize(&self) -> Result<(), MailerError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": CLIENT_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            )
            .await?;

        tracing::info!(
            server = ?result.get("serverInfo"),
            "Connected to messaging tool"
        );

        self.notify("notifications/initialized").await
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, MailerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut session = self.session.lock().await;

        session
            .write_message(&RpcRequest {
                jsonrpc: JSONRPC_VERSION,
                id: Some(id),
                method,
                params: Some(params),
            })
            .await?;

        session.read_response(id).await
    }

    async fn notify(&self, method: &str) -> Result<(), MailerError> {
        let mut session = self.session.lock().await;
        session
            .write_message(&RpcRequest {
                jsonrpc: JSONRPC_VERSION,
                id: None,
                method,
                params: None,
            })
            .await
    }
}

#[async_trait]
impl Mailer for McpMailer {
    async fn send(&self, email: &Email) -> Result<(), MailerError> {
        let mut arguments = json!({
            "to": email.to,
            "subject": email.subject,
            "text": email.text,
            "html": email.html,
        });
        if let Some(from) = &self.sender {
            arguments["from"] = json!(from);
        }

        let result = self
            .request(
                "tools/call",
                json!({ "name": self.tool_name, "arguments": arguments }),
            )
            .await?;

        let result: ToolCallResult = serde_json::from_value(result)?;
        if result.is_error {
            return Err(MailerError::ToolFailed(result.text()));
        }

        tracing::debug!(to = %email.to, "Email dispatched");
        Ok(())
    }

    fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }
}
