use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use shortly_core::Slug;

use crate::error::Result;
use crate::state::AppState;

/// `GET /r/{slug}`: answers with a `302 Found` pointing at the original URL.
pub async fn redirect_handler(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<Response> {
    let slug = Slug::new(slug)?;
    let url = state.redirector().resolve(&slug).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}
