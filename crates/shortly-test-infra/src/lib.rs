//! Disposable containers for integration tests.
//!
//! Each fixture owns its container; dropping the fixture stops it.

mod error;
pub mod mysql;
pub mod redis;

pub use error::{Result, TestInfraError};
pub use mysql::{MySqlConfig, MySqlServer};
pub use self::redis::RedisServer;
