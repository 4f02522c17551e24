//! API Routes
//!
//! Maps the cache host's HTTP surface onto handlers.
//!
//! | Method | Path        | Handler          |
//! |--------|-------------|------------------|
//! | PUT    | `/set`      | `set_handler`    |
//! | GET    | `/get/:key` | `get_handler`    |
//! | DELETE | `/del/:key` | `delete_handler` |
//! | POST   | `/clear`    | `clear_handler`  |
//! | GET    | `/stats`    | `stats_handler`  |
//! | GET    | `/health`   | `health_handler` |

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_handler, get_handler, health_handler, set_handler, stats_handler,
    AppState,
};

/// Builds the host router over a shared cache.
///
/// Every route is wrapped in a permissive CORS layer and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let cache_routes = Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/clear", post(clear_handler));

    let ops_routes = Router::new()
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler));

    cache_routes
        .merge(ops_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
