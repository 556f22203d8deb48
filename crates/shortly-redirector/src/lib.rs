//! The redirect hot path.
//!
//! [`RedirectorService`] resolves a slug to its original URL, consulting the
//! URL cache before durable storage. Everything that is not needed to answer
//! the request (populating the cache, counting the access, updating the
//! recent list) is handed to [`SideEffects`] and never awaited.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use shortly_cache::{InMemoryCounterStore, MokaUrlCache};
//! use shortly_core::Slug;
//! use shortly_redirector::{Redirector, RedirectorService, SideEffects, SideEffectsConfig};
//! use shortly_storage::InMemoryRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(MokaUrlCache::new());
//! let side_effects = SideEffects::spawn(
//!     SideEffectsConfig::default(),
//!     cache.clone(),
//!     Arc::new(InMemoryCounterStore::new()),
//!     None,
//! );
//! let service = RedirectorService::new(
//!     Arc::new(InMemoryRepository::new()),
//!     cache,
//!     Arc::new(side_effects),
//! );
//!
//! let url = service.resolve(&Slug::new("abc123")?).await?;
//! println!("redirect to {url}");
//! # Ok(())
//! # }
//! ```

mod error;
pub mod redirector;
pub mod service;
pub mod side_effects;

pub use error::{RedirectError, Result};
pub use redirector::Redirector;
pub use service::RedirectorService;
pub use side_effects::{SideEffect, SideEffects, SideEffectsConfig};
