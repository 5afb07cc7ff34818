//! Configuration validation

use super::Config;
use crate::telemetry::logging::{LOG_FORMATS, LOG_LEVELS};
use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print_diagnostics(&self) {
        for warning in &self.warnings {
            println!("[WARN] {}", warning);
        }
        for error in &self.errors {
            println!("[ERROR] {}", error);
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate configuration and return warnings/errors
pub fn validate(config: &Config) -> ValidationResult {
    let mut result = ValidationResult::new();

    validate_server(config, &mut result);
    validate_feed(config, &mut result);
    validate_logging(config, &mut result);

    result
}

fn validate_server(config: &Config, result: &mut ValidationResult) {
    let server = &config.server;

    if server.listen.parse::<SocketAddr>().is_err() {
        result.error(format!(
            "server.listen: '{}' is not a socket address",
            server.listen
        ));
    }

    if !server.path.starts_with('/') {
        result.error(format!(
            "server.path: '{}' must start with '/'",
            server.path
        ));
    } else if server.path == "/health" {
        result.error("server.path: '/health' is reserved");
    }

    let prefix_ok = server
        .prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':');
    if !prefix_ok || server.prefix.starts_with(|c: char| c.is_ascii_digit()) {
        result.error(format!(
            "server.prefix: '{}' is not a valid metric name prefix",
            server.prefix
        ));
    }
}

fn validate_feed(config: &Config, result: &mut ValidationResult) {
    let feed = &config.feed;

    if feed.channel_capacity == 0 {
        result.error("feed.channel_capacity: must be at least 1");
    }

    if feed.nodes.is_none() {
        result.warn("feed.nodes: no node snapshot, identities appear as NODEINFO packets arrive");
    }
}

fn validate_logging(config: &Config, result: &mut ValidationResult) {
    let logging = &config.logging;

    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        result.warn(format!(
            "logging.level: unknown level '{}', using info",
            logging.level
        ));
    }

    if !LOG_FORMATS.contains(&logging.format.as_str()) {
        result.warn(format!(
            "logging.format: unknown format '{}', using pretty",
            logging.format
        ));
    }
}
