//! Client configuration, loaded from `~/.boardlens/config.json`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::ViewMode;

fn default_timeout_seconds() -> u64 {
    30
}

/// Connection settings for the dashboard server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the dashboard server, e.g. `http://127.0.0.1:5000`.
    pub server_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub request_timeout_seconds: u64,
    /// Gantt lane mode used when none is given on the command line.
    #[serde(default)]
    pub default_mode: Option<ViewMode>,
}

/// Load configuration from the default location.
pub fn load_config() -> Result<ClientConfig, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    let config_path = home.join(".boardlens").join("config.json");
    load_config_from(&config_path)
}

/// Load configuration from an explicit path.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, String> {
    if !path.exists() {
        return Err(format!(
            "Config file not found at {}. Create it with: {{ \"serverUrl\": \"http://127.0.0.1:5000\" }}",
            path.display()
        ));
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;

    serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))
}
