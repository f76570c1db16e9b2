use axum::{
    Json,
    body::Body,
    extract::FromRequestParts,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::auth::claims::{AuthUser, CallerRole};
use crate::response::ApiResponse;

#[derive(serde::Serialize, Default)]
pub struct Empty;

/// Helper to extract, validate the caller from the request and insert the
/// claims back into the request extensions for handlers to read.
async fn extract_and_insert_authuser(
    req: Request<Body>,
) -> Result<(Request<Body>, AuthUser), (StatusCode, Json<ApiResponse<Empty>>)> {
    let (mut parts, body) = req.into_parts();
    let user = AuthUser::from_request_parts(&mut parts, &())
        .await
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error_kind(
                    "Unauthorized",
                    "Authentication required",
                )),
            )
        })?;

    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(user.clone());
    Ok((req, user))
}

/// Permits any verified caller.
pub async fn allow_authenticated(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, _user) = extract_and_insert_authuser(req).await?;
    Ok(next.run(req).await)
}

/// Permits staff and teachers; students may not issue tokens or write
/// manual overrides.
pub async fn allow_staff(
    req: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, Json<ApiResponse<Empty>>)> {
    let (req, AuthUser(claims)) = extract_and_insert_authuser(req).await?;

    match claims.role {
        CallerRole::Staff | CallerRole::Teacher => Ok(next.run(req).await),
        CallerRole::Student => Err((
            StatusCode::FORBIDDEN,
            Json(ApiResponse::error_kind(
                "Forbidden",
                "Staff or teacher role required",
            )),
        )),
    }
}
