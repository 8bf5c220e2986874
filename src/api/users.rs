use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, Result},
    models::{ApiResponse, CreateUserRequest, LoginRequest, UpdateUserRequest, User},
};

use super::AppState;

/// POST /users/login
///
/// Accepts `{"code": ...}` as a JSON body or `?code=` in the query string.
/// Legacy clients may send `openid` instead when the profile strategy is enabled.
pub async fn login(
    State(state): State<AppState>,
    query: std::result::Result<Query<LoginRequest>, QueryRejection>,
    body: Bytes,
) -> Result<Json<ApiResponse<User>>> {
    let Query(from_query) = query?;
    let from_body = parse_login_body(&body)?;
    let credential = from_body.merge(from_query).into_credential()?;

    let user = state.login.login(credential).await?;
    Ok(Json(ApiResponse::success(user)))
}

fn parse_login_body(body: &[u8]) -> Result<LoginRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(LoginRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidPayload(format!("Invalid login body: {}", e)))
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<User>>)> {
    let Json(req) = payload?;
    let new_user = req.into_new_user()?;
    let user = state.store.create_user(new_user).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// GET /users/{openid}
pub async fn get_user(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
) -> Result<Json<ApiResponse<User>>> {
    let Path(openid) = path?;
    let user = state
        .store
        .find_user_by_openid(&openid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", openid)))?;
    Ok(Json(ApiResponse::success(user)))
}

/// PUT /users/{openid}
pub async fn update_user(
    State(state): State<AppState>,
    path: std::result::Result<Path<String>, PathRejection>,
    payload: std::result::Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<User>>> {
    let Path(openid) = path?;
    let Json(update) = payload?;
    update.validate()?;
    let user = state.store.update_user(&openid, update).await?;
    Ok(Json(ApiResponse::success(user)))
}
