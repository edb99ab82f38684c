use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Command-line flags. A flag left off (and not set through its env var) is
/// `None` and is not serialized, so it never masks the config file.
#[derive(Parser, Serialize, Debug)]
#[command(name = "webterm-server", version, about = "Browser terminal and chat room server")]
pub struct Cli {
    /// Port to listen on [default: 8080]
    #[arg(long, env = "WEBTERM_PORT")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address [default: 0.0.0.0]
    #[arg(long, env = "WEBTERM_BIND_ADDRESS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Path to TOML config file
    #[arg(long, default_value = "./webterm.toml")]
    pub config: String,

    /// Enable structured JSON logging
    #[arg(long, env = "WEBTERM_JSON_LOGS")]
    #[serde(skip_serializing_if = "is_false")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub generate_config: bool,

    /// Data directory for the user database [default: ./data]
    #[arg(long, env = "WEBTERM_DATA_DIR")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Minimum milliseconds between accepted input lines per connection, 0 = off [default: 1000]
    #[arg(long, env = "WEBTERM_INPUT_INTERVAL_MS")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_interval_ms: Option<u64>,

    /// Input lines accepted back to back before the interval applies [default: 1]
    #[arg(long, env = "WEBTERM_INPUT_BURST")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_burst: Option<u32>,

    /// Only accept WebSocket upgrades whose Origin header equals this value
    #[arg(long, env = "WEBTERM_ALLOWED_ORIGIN")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origin: Option<String>,

    /// Seconds per replenished upgrade token, per client IP [default: 2]
    #[arg(long, env = "WEBTERM_WS_PER_SECOND")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_per_second: Option<u64>,

    /// Upgrade burst allowed per client IP [default: 20]
    #[arg(long, env = "WEBTERM_WS_BURST")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_burst: Option<u32>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Resolved server configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub config: String,
    pub json_logs: bool,
    pub generate_config: bool,
    pub data_dir: String,
    pub input_interval_ms: u64,
    pub input_burst: u32,
    pub allowed_origin: Option<String>,
    pub ws_per_second: u64,
    pub ws_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            config: "./webterm.toml".to_string(),
            json_logs: false,
            generate_config: false,
            data_dir: "./data".to_string(),
            input_interval_ms: 1000,
            input_burst: 1,
            allowed_origin: None,
            ws_per_second: 2,
            ws_burst: 20,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (WEBTERM_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        Self::from_cli(Cli::parse())
    }

    /// Resolve the layers beneath already parsed flags.
    pub fn from_cli(cli: Cli) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&cli.config))
            .merge(Env::prefixed("WEBTERM_"))
            .merge(Serialized::defaults(&cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Web terminal server configuration
# Place this file at ./webterm.toml or specify with --config <path>
# All settings can be overridden via environment variables (WEBTERM_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 8080)
# port = 8080

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging
# json_logs = false

# Data directory for the SQLite user database
# data_dir = "./data"

# ---- Input rate limit (per connection) ----
# Minimum spacing between accepted input lines; 0 disables the limit.
# Lines arriving too early are rejected with "Slow down: input ignored."
# input_interval_ms = 1000
# input_burst = 1

# ---- WebSocket upgrades ----
# Reject upgrades whose Origin header differs (unset = accept any origin)
# allowed_origin = "https://terminal.example.com"

# Per-IP upgrade rate: one token every ws_per_second seconds, up to ws_burst
# ws_per_second = 2
# ws_burst = 20
"#
    .to_string()
}
