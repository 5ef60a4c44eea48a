use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

fn default_tool_name() -> String {
    "send-email".into()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// How to launch and talk to the MCP email server.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct McpConfig {
    /// Executable that starts the MCP server (e.g. `node`)
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment for the server process, typically the provider API key
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Address used as `from`; when absent the server's own default applies
    pub sender: Option<String>,
    #[serde(default = "default_tool_name")]
    pub tool_name: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl McpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
