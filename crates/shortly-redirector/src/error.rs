use shortly_core::{ErrorKind, Slug, StorageError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RedirectError>;

#[derive(Debug, Error)]
pub enum RedirectError {
    /// The slug is unknown or its record has expired.
    #[error("short url not found: {0}")]
    NotFound(Slug),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RedirectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RedirectError::NotFound(_) => ErrorKind::NotFound,
            RedirectError::Storage(e) => e.kind(),
        }
    }
}
