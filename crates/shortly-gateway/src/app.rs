use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{create_url_handler, health_handler, recent_handler, redirect_handler};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/r/{slug}", get(redirect_handler))
            .nest(
                "/v1",
                Router::new()
                    .route("/urls", post(create_url_handler))
                    .route("/recent", get(recent_handler)),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
