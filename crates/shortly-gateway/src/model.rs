use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use shortly_core::ShortUrl;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecentResponse {
    pub slugs: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUrlRequest {
    pub original_url: String,
    #[serde(default)]
    pub custom_slug: Option<String>,
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UrlResponse {
    pub slug: String,
    pub original_url: String,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

impl From<ShortUrl> for UrlResponse {
    fn from(url: ShortUrl) -> Self {
        Self {
            slug: url.slug.to_string(),
            original_url: url.original_url,
            created_at: url.created_at,
            expires_at: url.expires_at,
        }
    }
}
