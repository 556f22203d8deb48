pub mod allocator;
pub mod random;
pub mod shortener;

pub use allocator::{GenerateError, SlugAllocator, DEFAULT_MAX_ATTEMPTS};
pub use random::{random_slug, RandomSlugGenerator, DEFAULT_SLUG_LENGTH};
pub use shortener::{ShortenError, ShortenRequest, ShortenerService};

use shortly_core::Slug;

/// Produces candidate slugs.
///
/// Generators are pure and never consult storage; uniqueness is the
/// [`SlugAllocator`]'s job.
pub trait Generator: Send + Sync + 'static {
    fn generate(&self) -> Slug;
}
