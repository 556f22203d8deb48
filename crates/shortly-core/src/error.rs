use thiserror::Error;

/// Result type for validation of core domain values.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Service-level classification of a failure.
///
/// Every error type in the workspace maps onto one of these kinds, which is
/// what outer layers (the HTTP gateway, logging) branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Unauthorized,
    AlreadyExists,
    Internal,
    UniqueConstraintViolation,
}

#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("invalid slug: {0}")]
    InvalidSlug(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid expiry: {0}")]
    InvalidExpiry(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache serialization failed: {0}")]
    Serialization(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
    #[error("cache key is invalid: {0}")]
    InvalidKey(String),
    #[error("cache initialization failed: {0}")]
    Initialization(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

impl CacheError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CacheError::InvalidKey(_) => ErrorKind::Validation,
            _ => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("slug already exists: {0}")]
    Conflict(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Conflict(_) => ErrorKind::UniqueConstraintViolation,
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::Cache(inner) => inner.kind(),
            _ => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_kinds() {
        assert_eq!(
            StorageError::Conflict("abc".into()).kind(),
            ErrorKind::UniqueConstraintViolation
        );
        assert_eq!(
            StorageError::NotFound("abc".into()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            StorageError::Timeout("pool".into()).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            StorageError::from(CacheError::InvalidKey("".into())).kind(),
            ErrorKind::Validation
        );
    }

    #[test]
    fn cache_errors_are_internal_except_bad_keys() {
        assert_eq!(
            CacheError::Unavailable("down".into()).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            CacheError::InvalidKey("".into()).kind(),
            ErrorKind::Validation
        );
    }
}
