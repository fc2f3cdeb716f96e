//! HTTP/JSON surface
//!
//! Thin `axum` adaptor over [`crate::store::Store`]: every handler maps
//! a request to a store call and the resulting `StoreError` to a
//! status code.

mod routes;

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::{self, ExpectedToken};
use crate::store::Store;

/// Builds the router: the 5 spec routes behind the auth filter, plus
/// request tracing.
pub fn build_router(store: Store, expected_token: ExpectedToken) -> Router {
    Router::new()
        .route("/api/v1/set", post(routes::set))
        .route("/api/v1/get/{key}", get(routes::get))
        .route("/api/v1/getby/{key}", get(routes::get_by))
        .route("/api/v1/remove/{key}", delete(routes::remove))
        .route("/api/v1/keys/{pattern}", get(routes::keys))
        .route_layer(middleware::from_fn_with_state(
            expected_token.clone(),
            auth::require_token,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}
