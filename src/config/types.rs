//! Configuration types

use crate::telemetry::LogConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// Default scrape endpoint address.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8000";

/// Default scrape endpoint path.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Default depth of the feed-to-dispatcher queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Exporter configuration (config.toml). Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
    pub path: String,
    /// Prepended to every metric name as `<prefix>_` when non-empty.
    pub prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
            path: DEFAULT_METRICS_PATH.to_string(),
            prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// JSON-lines packet source; `-` reads stdin.
    pub input: PathBuf,
    /// Node snapshot loaded into the registry at startup.
    pub nodes: Option<PathBuf>,
    pub channel_capacity: usize,
}

impl FeedConfig {
    pub fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == "-"
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("-"),
            nodes: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub input: Option<PathBuf>,
    pub nodes: Option<PathBuf>,
}

impl Config {
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(listen) = overrides.listen {
            self.server.listen = listen;
        }
        if let Some(input) = overrides.input {
            self.feed.input = input;
        }
        if let Some(nodes) = overrides.nodes {
            self.feed.nodes = Some(nodes);
        }
    }
}
