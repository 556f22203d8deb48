use std::time::Duration;

use jiff::{SignedDuration, Timestamp};
use shortly_core::{NewShortUrl, Slug, UpdateShortUrl};
use shortly_storage::{AccessCountSink, MySqlRepository, ReadRepository, Repository, StorageError};
use shortly_test_infra::{MySqlConfig, MySqlServer};
use sqlx::mysql::MySqlPoolOptions;

struct Fixture {
    _mysql: MySqlServer,
    repo: MySqlRepository,
}

impl Fixture {
    async fn start() -> Self {
        let mysql = MySqlServer::start(MySqlConfig::default())
            .await
            .expect("start mysql");
        let url = mysql.database_url().await.expect("mysql url");
        let repo = MySqlRepository::new(connect_with_retry(&url).await);
        repo.ensure_schema().await.expect("create schema");

        Self { _mysql: mysql, repo }
    }
}

// The image logs readiness once for its bootstrap server, before the real
// one is listening.
async fn connect_with_retry(url: &str) -> sqlx::MySqlPool {
    let mut last_error = None;

    for _ in 0..20 {
        match MySqlPoolOptions::new().max_connections(5).connect(url).await {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect mysql: {last_error:?}");
}

fn slug(value: &str) -> Slug {
    Slug::new_unchecked(value)
}

fn new_url(value: &str, expires_at: Option<Timestamp>) -> NewShortUrl {
    NewShortUrl {
        slug: slug(value),
        original_url: format!("https://example.com/{value}"),
        user_id: "user-1".to_string(),
        expires_at,
    }
}

#[tokio::test]
async fn create_and_get_by_slug() {
    let fixture = Fixture::start().await;

    let created = fixture.repo.create(new_url("abc123", None)).await.unwrap();
    let got = fixture
        .repo
        .get_by_slug(&slug("abc123"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(got, created);
    assert_eq!(got.access_count, 0);
    assert_eq!(fixture.repo.get(created.id).await.unwrap(), Some(created));
    assert!(fixture.repo.get_by_slug(&slug("missing")).await.unwrap().is_none());
}

#[tokio::test]
async fn create_conflicts_on_existing_slug() {
    let fixture = Fixture::start().await;

    fixture.repo.create(new_url("abc123", None)).await.unwrap();
    let err = fixture.repo.create(new_url("abc123", None)).await.unwrap_err();

    assert!(matches!(err, StorageError::Conflict(_)));
}

#[tokio::test]
async fn expired_rows_are_still_returned() {
    let fixture = Fixture::start().await;
    let expired = Timestamp::from_second(Timestamp::now().as_second() - 60).unwrap();

    fixture
        .repo
        .create(new_url("expired", Some(expired)))
        .await
        .unwrap();

    let got = fixture
        .repo
        .get_by_slug(&slug("expired"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(got.expires_at, Some(expired));
    assert!(got.is_expired_at(Timestamp::now()));
}

#[tokio::test]
async fn update_and_delete() {
    let fixture = Fixture::start().await;
    let row = fixture.repo.create(new_url("abc123", None)).await.unwrap();
    let expires = Timestamp::from_second(
        (Timestamp::now() + SignedDuration::from_hours(1)).as_second(),
    )
    .unwrap();

    let updated = fixture
        .repo
        .update(
            row.id,
            UpdateShortUrl {
                original_url: Some("https://changed.example".to_string()),
                expires_at: Some(expires),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.original_url, "https://changed.example");
    assert_eq!(
        fixture.repo.get(row.id).await.unwrap().unwrap().expires_at,
        Some(expires)
    );

    let err = fixture
        .repo
        .update(row.id + 100, UpdateShortUrl::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));

    assert!(fixture.repo.delete(row.id).await.unwrap());
    assert!(!fixture.repo.delete(row.id).await.unwrap());
    assert!(!fixture.repo.slug_exists(&slug("abc123")).await.unwrap());
}

#[tokio::test]
async fn list_by_user_returns_only_that_users_rows() {
    let fixture = Fixture::start().await;
    fixture.repo.create(new_url("aaa111", None)).await.unwrap();
    fixture.repo.create(new_url("bbb222", None)).await.unwrap();
    let mut other = new_url("ccc333", None);
    other.user_id = "user-2".to_string();
    fixture.repo.create(other).await.unwrap();

    let rows = fixture.repo.list_by_user("user-1").await.unwrap();
    let slugs: Vec<&str> = rows.iter().map(|row| row.slug.as_str()).collect();
    assert_eq!(slugs, vec!["aaa111", "bbb222"]);
}

#[tokio::test]
async fn access_count_increments_are_additive() {
    let fixture = Fixture::start().await;
    fixture.repo.create(new_url("abc123", None)).await.unwrap();

    fixture
        .repo
        .increment_access_count(&slug("abc123"), 5)
        .await
        .unwrap();
    fixture
        .repo
        .increment_access_count(&slug("abc123"), 5)
        .await
        .unwrap();
    fixture
        .repo
        .increment_access_count(&slug("abc123"), 0)
        .await
        .unwrap();

    let row = fixture
        .repo
        .get_by_slug(&slug("abc123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.access_count, 10);
}

#[tokio::test]
async fn access_count_for_unknown_slug_is_not_found() {
    let fixture = Fixture::start().await;

    let err = fixture
        .repo
        .increment_access_count(&slug("missing"), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound(_)));
}
