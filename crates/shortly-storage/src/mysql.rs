use async_trait::async_trait;
use jiff::Timestamp;
use shortly_core::repository::Result;
use shortly_core::{
    AccessCountSink, NewShortUrl, ReadRepository, Repository, ShortUrl, Slug, StorageError,
    UpdateShortUrl,
};
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::Row;
use tracing::{debug, trace};

use crate::MYSQL_SCHEMA;

const SELECT_COLUMNS: &str =
    "SELECT id, slug, original_url, user_id, created_at, expires_at, access_count FROM short_urls";

/// MySQL implementation of the repository and the access-count sink.
///
/// Timestamps are stored as unix seconds.
#[derive(Debug, Clone)]
pub struct MySqlRepository {
    pool: MySqlPool,
}

impl MySqlRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Opens a new connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `short_urls` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(MYSQL_SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn fetch_one_by_id(&self, id: u64) -> Result<Option<ShortUrl>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ? LIMIT 1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.as_ref().map(short_url_from_row).transpose()
    }
}

fn parse_timestamp(column: &str, seconds: i64) -> Result<Timestamp> {
    Timestamp::from_second(seconds).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{seconds}': {e}"))
    })
}

fn short_url_from_row(row: &MySqlRow) -> Result<ShortUrl> {
    let slug: String = row.try_get("slug").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;

    Ok(ShortUrl {
        id: row.try_get("id").map_err(map_sqlx_error)?,
        slug: Slug::new_unchecked(slug),
        original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
        user_id: row.try_get("user_id").map_err(map_sqlx_error)?,
        created_at: parse_timestamp("created_at", created_at)?,
        expires_at: expires_at
            .map(|s| parse_timestamp("expires_at", s))
            .transpose()?,
        access_count: row.try_get("access_count").map_err(map_sqlx_error)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadRepository for MySqlRepository {
    async fn get_by_slug(&self, slug: &Slug) -> Result<Option<ShortUrl>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE slug = ? LIMIT 1"))
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        trace!(slug = %slug, found = row.is_some(), "looked up short url");
        row.as_ref().map(short_url_from_row).transpose()
    }

    async fn get(&self, id: u64) -> Result<Option<ShortUrl>> {
        self.fetch_one_by_id(id).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<ShortUrl>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE user_id = ? ORDER BY id"))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(short_url_from_row).collect()
    }

    async fn slug_exists(&self, slug: &Slug) -> Result<bool> {
        let exists = sqlx::query("SELECT 1 FROM short_urls WHERE slug = ? LIMIT 1")
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(exists)
    }
}

#[async_trait]
impl Repository for MySqlRepository {
    async fn create(&self, input: NewShortUrl) -> Result<ShortUrl> {
        let created_at = Timestamp::now();

        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (slug, original_url, user_id, created_at, expires_at, access_count)
            VALUES (?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(input.slug.as_str())
        .bind(&input.original_url)
        .bind(&input.user_id)
        .bind(created_at.as_second())
        .bind(input.expires_at.map(|ts| ts.as_second()))
        .execute(&self.pool)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_id(),
            Err(err) if is_unique_violation(&err) => {
                return Err(StorageError::Conflict(input.slug.to_string()))
            }
            Err(err) => return Err(map_sqlx_error(err)),
        };

        debug!(id, slug = %input.slug, "created short url");
        Ok(ShortUrl {
            id,
            slug: input.slug,
            original_url: input.original_url,
            user_id: input.user_id,
            // Stored with second precision.
            created_at: parse_timestamp("created_at", created_at.as_second())?,
            expires_at: input.expires_at,
            access_count: 0,
        })
    }

    async fn update(&self, id: u64, input: UpdateShortUrl) -> Result<ShortUrl> {
        let Some(mut current) = self.fetch_one_by_id(id).await? else {
            return Err(StorageError::NotFound(format!("short url {id}")));
        };

        if let Some(slug) = input.slug {
            current.slug = slug;
        }
        if let Some(original_url) = input.original_url {
            current.original_url = original_url;
        }
        if let Some(expires_at) = input.expires_at {
            current.expires_at = Some(expires_at);
        }

        let result = sqlx::query(
            "UPDATE short_urls SET slug = ?, original_url = ?, expires_at = ? WHERE id = ?",
        )
        .bind(current.slug.as_str())
        .bind(&current.original_url)
        .bind(current.expires_at.map(|ts| ts.as_second()))
        .bind(id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(current),
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(current.slug.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn delete(&self, id: u64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM short_urls WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl AccessCountSink for MySqlRepository {
    async fn increment_access_count(&self, slug: &Slug, delta: u64) -> Result<()> {
        // MySQL reports unchanged rows as unaffected, so a zero delta is
        // answered with an existence check instead.
        if delta == 0 {
            return if self.slug_exists(slug).await? {
                Ok(())
            } else {
                Err(StorageError::NotFound(slug.to_string()))
            };
        }

        let result =
            sqlx::query("UPDATE short_urls SET access_count = access_count + ? WHERE slug = ?")
                .bind(delta)
                .bind(slug.as_str())
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(slug.to_string()));
        }

        trace!(slug = %slug, delta, "persisted access count");
        Ok(())
    }
}
