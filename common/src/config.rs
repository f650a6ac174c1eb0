//! Runtime configuration.
//!
//! Values come from environment variables. Loaders are written over a
//! lookup function so they can be exercised without touching the process
//! environment.

use std::str::FromStr;

use crate::models::connection::ServerCredentials;

/// Default HTTP port of the explorer service.
pub const DEFAULT_PORT: u16 = 8083;

/// Connection timeout requested for every session, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable `fmt` output.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Name reported in responses and logs.
    pub service_name: String,
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Timeout applied to connect + login of every session.
    pub connect_timeout_secs: u64,
    /// Log output format.
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Loads the configuration of `service` from the process environment.
    pub fn load_with_service(service: &str) -> Self {
        Self::from_lookup(service, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(service: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            service_name: service.to_string(),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "SERVER_PORT", DEFAULT_PORT),
            connect_timeout_secs: parse_or(
                &lookup,
                "CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            ),
            log_format: parse_or(&lookup, "LOG_FORMAT", LogFormat::Pretty),
        }
    }

    /// Address the HTTP listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ServerCredentials {
    /// Seeds the credential fields from the process environment.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds credentials from an arbitrary key lookup, falling back to the
    /// default form values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerCredentials::default();
        Self {
            server: lookup("MSSQL_SERVER").unwrap_or(defaults.server),
            username: lookup("MSSQL_USERNAME").unwrap_or(defaults.username),
            password: lookup("MSSQL_PASSWORD").unwrap_or(defaults.password),
            driver: lookup("MSSQL_DRIVER").unwrap_or(defaults.driver),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
            default
        }),
        None => default,
    }
}
