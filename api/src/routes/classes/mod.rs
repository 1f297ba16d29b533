pub mod post;
pub mod sessions;

use axum::{Router, middleware::from_fn, routing::post as post_method};
use util::state::AppState;

use crate::auth::guards::allow_admin;

pub fn classes_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post_method(post::create_class).route_layer(from_fn(allow_admin)),
        )
        .route(
            "/{class_id}/students/{user_id}",
            post_method(post::enroll_student),
        )
        .nest("/{class_id}/sessions", sessions::session_routes())
}
