use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use shortly_core::{ErrorKind, Slug};
use shortly_generator::ShortenRequest;

use crate::error::{AppError, Result};
use crate::model::{CreateUrlRequest, UrlResponse};
use crate::state::AppState;

/// Header carrying the caller's id, set by the auth layer in front of us.
pub const USER_ID_HEADER: &str = "x-user-id";

fn user_id(headers: &HeaderMap) -> Result<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::new(ErrorKind::Unauthorized, "missing user id"))
}

/// `POST /v1/urls`
pub async fn create_url_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateUrlRequest>,
) -> Result<(StatusCode, Json<UrlResponse>)> {
    let user_id = user_id(&headers)?;
    let custom_slug = request.custom_slug.map(Slug::new).transpose()?;

    let created = state
        .shortener()
        .shorten(ShortenRequest {
            original_url: request.original_url,
            user_id,
            custom_slug,
            expires_at: request.expires_at,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}
