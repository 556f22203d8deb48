use crate::Result;
use async_trait::async_trait;
use shortly_core::Slug;

#[async_trait]
pub trait Redirector: Send + Sync + 'static {
    /// Resolves a slug to the URL to redirect to.
    ///
    /// Unknown and expired slugs are [`RedirectError::NotFound`](crate::RedirectError::NotFound).
    async fn resolve(&self, slug: &Slug) -> Result<String>;
}
