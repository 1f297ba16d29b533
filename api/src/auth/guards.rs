use axum::{
    Json,
    body::Body,
    extract::FromRequestParts,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use db::models::{user, user_class_role::Role};
use sea_orm::DatabaseConnection;

use crate::auth::claims::{AuthUser, Claims};
use crate::response::ApiResponse;

#[derive(serde::Serialize, Default)]
pub struct Empty;

/// Helper to extract and validate the user from request parts and insert it
/// back into the request extensions for downstream handlers.
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), (StatusCode, Json<ApiResponse<Empty>>)> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error("Authentication required")),
            )
        })?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Basic guard to ensure the request is authenticated.
pub async fn allow_authenticated(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, _user) = extract_and_insert_authuser(req).await?;

    Ok(next.run(req).await)
}

/// Admin-only guard.
pub async fn allow_admin(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, user) = extract_and_insert_authuser(req).await?;

    if !user.0.admin {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error("Admin access required")),
        ));
    }

    Ok(next.run(req).await)
}

/// Whether the caller may manage a class's sessions: admins always, teachers
/// only within their own classes. Denies on DB error (fail-safe).
pub async fn can_manage_class(db: &DatabaseConnection, claims: &Claims, class_id: i64) -> bool {
    if claims.admin {
        return true;
    }
    match user::Model::is_in_role(db, claims.sub, class_id, Role::Teacher).await {
        Ok(is_teacher) => is_teacher,
        Err(e) => {
            tracing::warn!(
                error = %e,
                user_id = claims.sub,
                class_id,
                "DB error while checking teacher role; denying access"
            );
            false
        }
    }
}
