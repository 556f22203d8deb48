use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use jiff::{SignedDuration, Timestamp};
use shortly_cache::{InMemoryCounterStore, MokaUrlCache};
use shortly_core::{NewShortUrl, Repository, Slug};
use shortly_gateway::app::App;
use shortly_gateway::model::{ErrorResponse, HealthResponse, RecentResponse, UrlResponse};
use shortly_gateway::state::AppState;
use shortly_generator::ShortenerService;
use shortly_redirector::{RedirectorService, SideEffects, SideEffectsConfig};
use shortly_storage::InMemoryRepository;
use shortly_worker::{AccessSyncWorker, WorkerConfig};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    repo: Arc<InMemoryRepository>,
    counters: Arc<InMemoryCounterStore>,
    side_effects: Arc<SideEffects>,
}

impl TestApp {
    fn new() -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let cache = Arc::new(MokaUrlCache::new());
        let counters = Arc::new(InMemoryCounterStore::new());
        let side_effects = Arc::new(SideEffects::spawn(
            SideEffectsConfig::default(),
            cache.clone(),
            counters.clone(),
            None,
        ));
        let redirector = Arc::new(RedirectorService::new(
            repo.clone(),
            cache,
            side_effects.clone(),
        ));
        Self {
            router: App::router(AppState::new(
                redirector,
                Arc::new(ShortenerService::new(repo.clone())),
                None,
            )),
            repo,
            counters,
            side_effects,
        }
    }

    async fn insert(&self, slug: &str, expires_at: Option<Timestamp>) {
        self.repo
            .create(NewShortUrl {
                slug: Slug::new_unchecked(slug),
                original_url: format!("https://example.com/{slug}"),
                user_id: "user-1".to_string(),
                expires_at,
            })
            .await
            .unwrap();
    }

    async fn get(&self, uri: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

impl TestApp {
    async fn post_url(&self, user: Option<&str>, body: serde_json::Value) -> axum::response::Response {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/v1/urls")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            request = request.header("x-user-id", user);
        }
        self.router
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }
}

async fn json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let app = TestApp::new();
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: HealthResponse = json(response).await;
    assert_eq!(body.status, "ok");
}

#[tokio::test]
async fn redirect_returns_found_with_location() {
    let app = TestApp::new();
    app.insert("abc123", None).await;

    let response = app.get("/r/abc123").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://example.com/abc123"
    );
}

#[tokio::test]
async fn unknown_slug_is_404() {
    let app = TestApp::new();
    let response = app.get("/r/nope00").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: ErrorResponse = json(response).await;
    assert!(body.error.contains("nope00"));
}

#[tokio::test]
async fn expired_slug_is_404() {
    let app = TestApp::new();
    app.insert("old123", Some(Timestamp::now() - SignedDuration::from_secs(60)))
        .await;
    assert_eq!(app.get("/r/old123").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_slug_is_400() {
    let app = TestApp::new();
    assert_eq!(app.get("/r/no%20spaces").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn recent_is_empty_without_redis() {
    let app = TestApp::new();
    let response = app.get("/v1/recent?limit=5").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: RecentResponse = json(response).await;
    assert!(body.slugs.is_empty());
}

#[tokio::test]
async fn redirects_are_counted_and_reconciled() {
    let app = TestApp::new();
    app.insert("abc123", None).await;

    for _ in 0..3 {
        assert_eq!(app.get("/r/abc123").await.status(), StatusCode::FOUND);
    }
    app.side_effects.shutdown().await;
    assert_eq!(app.counters.value("abc123"), Some(3));

    let worker = AccessSyncWorker::new(
        app.counters.clone(),
        app.repo.clone(),
        WorkerConfig::default(),
    );
    let report = worker.run_pass().await;
    assert_eq!(report.processed, 1);
    assert_eq!(app.repo.access_count("abc123"), Some(3));
    assert!(app.counters.is_empty());
}

#[tokio::test]
async fn created_url_can_be_redirected() {
    let app = TestApp::new();

    let response = app
        .post_url(
            Some("user-1"),
            serde_json::json!({ "original_url": "https://example.com/long/path" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: UrlResponse = json(response).await;
    assert_eq!(created.original_url, "https://example.com/long/path");
    assert!(created.expires_at.is_none());

    let response = app.get(&format!("/r/{}", created.slug)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://example.com/long/path"
    );
}

#[tokio::test]
async fn create_requires_a_user() {
    let app = TestApp::new();
    let response = app
        .post_url(None, serde_json::json!({ "original_url": "https://example.com" }))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_rejects_invalid_input() {
    let app = TestApp::new();
    let bad_url = app
        .post_url(Some("user-1"), serde_json::json!({ "original_url": "not a url" }))
        .await;
    assert_eq!(bad_url.status(), StatusCode::BAD_REQUEST);

    let bad_slug = app
        .post_url(
            Some("user-1"),
            serde_json::json!({ "original_url": "https://example.com", "custom_slug": "a/b" }),
        )
        .await;
    assert_eq!(bad_slug.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn taken_custom_slug_is_409() {
    let app = TestApp::new();
    app.insert("mine01", None).await;

    let response = app
        .post_url(
            Some("user-2"),
            serde_json::json!({ "original_url": "https://example.com", "custom_slug": "mine01" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
