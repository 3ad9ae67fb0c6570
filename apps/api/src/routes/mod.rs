pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::documents::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/documents",
            get(handlers::handle_list)
                .post(handlers::handle_upload)
                .delete(handlers::handle_delete),
        )
        .route("/api/v1/documents/page", get(handlers::handle_get_page))
        .route("/api/v1/documents/pages", get(handlers::handle_get_page_range))
        .with_state(state)
}
