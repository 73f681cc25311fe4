//! Server, bootstrap and import configuration types.

use std::time::Duration;

use serde::Deserialize;

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// HTTP port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Schema bootstrap configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Upper bound in seconds for each storage call of the bootstrap sequence.
    pub step_timeout: u64,
    /// Retries of transient failures within one attempt.
    pub max_retries: usize,
    /// Minimum backoff between in-attempt retries, in milliseconds.
    pub min_backoff_ms: u64,
    /// Maximum backoff between in-attempt retries, in milliseconds.
    pub max_backoff_ms: u64,
    /// Base cooldown in seconds after a failed attempt.
    /// Doubles with consecutive failures, capped at 8x.
    pub cooldown: u64,
    /// Exit the server when the startup bootstrap fails.
    pub fail_fast: bool,
    /// bcrypt cost for the seeded user's password.
    pub password_cost: u32,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            step_timeout: 10,
            max_retries: 3,
            min_backoff_ms: 100,
            max_backoff_ms: 2000,
            cooldown: 5,
            fail_fast: false,
            password_cost: 10,
        }
    }
}

impl BootstrapConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown)
    }
}

/// Bulk import client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Invoice write endpoint.
    pub endpoint: String,
    /// Endpoint listing the known customers.
    pub customers_endpoint: String,
    /// Request timeout in seconds.
    pub timeout: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/invoices".to_string(),
            customers_endpoint: "http://localhost:3000/api/customers".to_string(),
            timeout: 30,
        }
    }
}

impl ImportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
