//! Application state.

use std::sync::Arc;

use jsonwebtoken::DecodingKey;

use boukir_store::DocumentStore;

use crate::config::ServiceConfig;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The document store.
    pub store: Arc<dyn DocumentStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Key verifying bearer tokens, derived once from the configured secret.
    pub jwt_key: DecodingKey,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, config: ServiceConfig) -> Self {
        let jwt_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self {
            store,
            config,
            jwt_key,
        }
    }
}
