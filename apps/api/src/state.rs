use std::sync::Arc;

use crate::config::Config;
use crate::storage::PageStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Page storage backend. Postgres in production, in-memory for local runs and tests.
    pub store: Arc<dyn PageStore>,
    pub config: Config,
}
