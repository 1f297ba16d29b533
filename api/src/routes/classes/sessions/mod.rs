pub mod common;
pub mod get;
pub mod post;
pub mod put;

use axum::{
    Router,
    routing::{get as get_method, post as post_method, put as put_method},
};
use util::state::AppState;

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/", post_method(post::start_session))
        .route("/{session_id}/extend", put_method(put::extend_session))
        .route("/{session_id}/end", put_method(put::end_session))
        .route("/{session_id}/token", get_method(get::current_token))
}
