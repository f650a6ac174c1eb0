//! Application state for the explorer service.

use std::sync::Arc;

use tokio::sync::RwLock;

use common::config::AppConfig;
use common::models::ServerCredentials;

use crate::catalog::Catalog;
use crate::mssql::TdsSessionFactory;
use crate::session::SessionFactory;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Credential fields of the form; replaced as a whole on edit.
    pub credentials: Arc<RwLock<ServerCredentials>>,
    pub sessions: Arc<dyn SessionFactory>,
}

impl AppState {
    /// Creates the state backed by real SQL Server sessions.
    pub fn new(config: AppConfig, credentials: ServerCredentials) -> Self {
        Self::with_sessions(config, credentials, Arc::new(TdsSessionFactory))
    }

    pub fn with_sessions(
        config: AppConfig,
        credentials: ServerCredentials,
        sessions: Arc<dyn SessionFactory>,
    ) -> Self {
        Self {
            config,
            credentials: Arc::new(RwLock::new(credentials)),
            sessions,
        }
    }

    /// Catalog bound to the credentials as they are right now.
    pub async fn catalog(&self) -> Catalog {
        let credentials = self.credentials.read().await.clone();
        Catalog::new(
            Arc::clone(&self.sessions),
            credentials,
            self.config.connect_timeout_secs,
        )
    }

    pub async fn replace_credentials(&self, credentials: ServerCredentials) {
        *self.credentials.write().await = credentials;
    }
}
