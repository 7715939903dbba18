//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::live_reload;
use crate::middleware::headers;
use crate::state::AppState;
use crate::static_files;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `root` - Directory served for every path not claimed by a route
pub(crate) fn create_router(state: Arc<AppState>, root: &Path) -> Router {
    Router::new()
        .route(&state.endpoint, get(live_reload::ws_handler))
        .route(
            static_files::CLIENT_SCRIPT_PATH,
            get(static_files::client_script),
        )
        .fallback_service(static_files::serve_dir(root))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(headers::no_cache_layer()),
        )
        .with_state(state)
}
