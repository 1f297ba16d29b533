pub mod post;

use axum::{Router, routing::post as post_method};
use util::state::AppState;

pub fn sweep_routes() -> Router<AppState> {
    Router::new().route("/", post_method(post::trigger_sweep))
}
