// crates/hcp-daemon/src/config.rs
//
// Runtime configuration for the HCP server.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;

use hcp_rpc::RpcConfig;
use hcp_store::{StoreConfig, DEFAULT_MAX_METRIC_BATCH};

/// Runtime configuration for the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Directory holding the RocksDB database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Host address for the RPC server.
    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    /// Port for the RPC server.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Log level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Deadline for every RPC call, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Largest metric batch accepted in one call.
    #[serde(default = "default_max_metric_batch")]
    pub max_metric_batch: usize,
}

fn default_data_dir() -> String {
    "~/.hcp/data".to_string()
}

fn default_rpc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    50051
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_max_metric_batch() -> usize {
    DEFAULT_MAX_METRIC_BATCH
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            rpc_host: default_rpc_host(),
            rpc_port: default_rpc_port(),
            log_level: default_log_level(),
            request_timeout_ms: default_request_timeout_ms(),
            max_metric_batch: default_max_metric_batch(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(expand_tilde(path))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(toml::from_str(contents)?)
    }

    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            host: self.rpc_host.clone(),
            port: self.rpc_port,
            request_timeout_ms: self.request_timeout_ms,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            max_metric_batch: self.max_metric_batch,
        }
    }

    /// Path of the telemetry database inside `data_dir`.
    pub fn db_path(&self) -> String {
        format!("{}/telemetry", expand_tilde(&self.data_dir))
    }
}

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
