//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → health check (public)
//! - `/classes` → class creation, enrollment, and session lifecycle
//!   (authenticated; per-class teacher checks inside handlers)
//! - `/checkins` → student scan/verify plus teacher override (authenticated)
//! - `/sweep` → on-demand absence sweep trigger (authenticated)

use axum::{Router, middleware::from_fn};
use util::state::AppState;

use crate::auth::guards::allow_authenticated;

pub mod checkins;
pub mod classes;
pub mod common;
pub mod health;
pub mod sweep;

/// Builds the complete application router for all HTTP endpoints.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health::health_routes())
        .nest(
            "/classes",
            classes::classes_routes().route_layer(from_fn(allow_authenticated)),
        )
        .nest(
            "/checkins",
            checkins::checkins_routes().route_layer(from_fn(allow_authenticated)),
        )
        .nest(
            "/sweep",
            sweep::sweep_routes().route_layer(from_fn(allow_authenticated)),
        )
        .with_state(app_state)
}
