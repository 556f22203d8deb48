use crate::slug::Slug;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A persisted short URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortUrl {
    pub id: u64,
    pub slug: Slug,
    pub original_url: String,
    /// Owner of the slug, as issued by the auth layer.
    pub user_id: String,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    /// Reconciled redirect count. Only ever grows.
    pub access_count: u64,
}

impl ShortUrl {
    /// Returns `true` if the record has an expiry at or before `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }

    /// The projection of this record that the redirect path caches.
    pub fn record(&self) -> UrlRecord {
        UrlRecord {
            original_url: self.original_url.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// The cached view of a short URL: just enough to redirect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The original URL that was shortened.
    pub original_url: String,
    /// When the record expires, if ever.
    pub expires_at: Option<Timestamp>,
}

/// Input for creating a short URL.
#[derive(Debug, Clone)]
pub struct NewShortUrl {
    pub slug: Slug,
    pub original_url: String,
    pub user_id: String,
    pub expires_at: Option<Timestamp>,
}

/// Partial update of a short URL. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateShortUrl {
    pub slug: Option<Slug>,
    pub original_url: Option<String>,
    pub expires_at: Option<Timestamp>,
}
