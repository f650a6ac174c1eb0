//! Connection models.
//!
//! [`ServerCredentials`] are the four fields the operator types into the
//! form. [`ConnectionConfig`] is the per-operation descriptor built from
//! them for one target database; it is never cached.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::DEFAULT_CONNECT_TIMEOUT_SECS;

/// Database every catalog listing connects to.
pub const MASTER_DATABASE: &str = "master";

/// Driver identifier pre-filled in the form.
pub const DEFAULT_DRIVER: &str = "{ODBC Driver 18 for SQL Server}";

/// Credential fields held in process-wide state.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerCredentials {
    /// Server address: `host`, `host,port` or `tcp:host,port`.
    pub server: String,
    /// SQL login.
    pub username: String,
    /// SQL password, never serialized or logged.
    pub password: String,
    /// Driver identifier.
    pub driver: String,
}

impl Default for ServerCredentials {
    fn default() -> Self {
        Self {
            server: "bossdb.database.windows.net".to_string(),
            username: "boss".to_string(),
            password: String::new(),
            driver: DEFAULT_DRIVER.to_string(),
        }
    }
}

impl fmt::Debug for ServerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerCredentials")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &"***")
            .field("driver", &self.driver)
            .finish()
    }
}

/// Connection descriptor for one session against one database.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub driver: String,
    pub database: String,
    pub timeout_secs: u64,
    pub encrypt: bool,
    pub trust_server_certificate: bool,
}

impl ConnectionConfig {
    /// Builds the descriptor for `database` from the current credentials.
    ///
    /// Encryption is always requested and the server certificate is always
    /// validated. Inputs are passed through unchecked.
    pub fn for_database(credentials: &ServerCredentials, database: &str, timeout_secs: u64) -> Self {
        Self {
            server: credentials.server.clone(),
            username: credentials.username.clone(),
            password: credentials.password.clone(),
            driver: credentials.driver.clone(),
            database: database.to_string(),
            timeout_secs,
            encrypt: true,
            trust_server_certificate: false,
        }
    }

    /// Descriptor against `master`, used for the database listing.
    pub fn for_master(credentials: &ServerCredentials, timeout_secs: u64) -> Self {
        Self::for_database(credentials, MASTER_DATABASE, timeout_secs)
    }

    /// ODBC-style connection string with the password masked.
    pub fn redacted_connection_string(&self) -> String {
        format!(
            "DRIVER={};SERVER={};DATABASE={};UID={};PWD={};Encrypt={};TrustServerCertificate={};Connection Timeout={};",
            self.driver,
            self.server,
            self.database,
            self.username,
            "***",
            yes_no(self.encrypt),
            yes_no(self.trust_server_certificate),
            self.timeout_secs,
        )
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::for_master(&ServerCredentials::default(), DEFAULT_CONNECT_TIMEOUT_SECS)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted_connection_string())
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Credential fields as shown back to the form (excludes the password).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CredentialsItem {
    /// Server address.
    pub server: String,
    /// SQL login.
    pub username: String,
    /// Driver identifier.
    pub driver: String,
    /// Whether a non-empty password is set.
    pub password_set: bool,
}

impl From<&ServerCredentials> for CredentialsItem {
    fn from(creds: &ServerCredentials) -> Self {
        Self {
            server: creds.server.clone(),
            username: creds.username.clone(),
            driver: creds.driver.clone(),
            password_set: !creds.password.is_empty(),
        }
    }
}

/// Request body replacing the credential fields.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCredentialsRequest {
    /// Server address.
    pub server: String,
    /// SQL login.
    pub username: String,
    /// SQL password (may be empty).
    #[serde(default)]
    pub password: String,
    /// Driver identifier (defaults to the ODBC 18 driver).
    pub driver: Option<String>,
}

impl UpdateCredentialsRequest {
    /// Converts the request into credentials.
    pub fn into_credentials(self) -> ServerCredentials {
        ServerCredentials {
            server: self.server,
            username: self.username,
            password: self.password,
            driver: self.driver.unwrap_or_else(|| DEFAULT_DRIVER.to_string()),
        }
    }
}
