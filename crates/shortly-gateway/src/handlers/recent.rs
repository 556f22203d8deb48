use axum::extract::{Query, State};
use axum::Json;

use crate::error::Result;
use crate::model::{RecentQuery, RecentResponse};
use crate::state::AppState;

const DEFAULT_RECENT_LIMIT: usize = 10;

pub async fn recent_handler(
    Query(query): Query<RecentQuery>,
    State(state): State<AppState>,
) -> Result<Json<RecentResponse>> {
    let slugs = match state.recent() {
        Some(recent) => {
            recent
                .list(query.limit.unwrap_or(DEFAULT_RECENT_LIMIT))
                .await?
        }
        None => Vec::new(),
    };
    Ok(Json(RecentResponse { slugs }))
}
