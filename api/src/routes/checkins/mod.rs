pub mod common;
pub mod post;
pub mod put;

use axum::{
    Router,
    routing::{post as post_method, put as put_method},
};
use util::state::AppState;

pub fn checkins_routes() -> Router<AppState> {
    Router::new()
        .route("/scan", post_method(post::scan))
        .route("/verify", post_method(post::verify))
        .route("/{record_id}", put_method(put::override_status))
}
