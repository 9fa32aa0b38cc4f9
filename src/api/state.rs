//! Application state for the API server

use crate::error::{Error, Result};
use crate::Config;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request. Conversion runs share the HTTP connection pool but
/// nothing else.
#[derive(Clone)]
pub struct AppState {
    /// HTTP client reused by every conversion run
    pub http: reqwest::Client,

    /// Server configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sheet-relay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::ApiServerError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}
