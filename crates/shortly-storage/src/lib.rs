//! Durable storage for short URLs.
//!
//! Both repositories implement [`shortly_core::Repository`] and the durable
//! side of access counting, [`shortly_core::AccessCountSink`].

pub mod memory;
pub mod mysql;

pub use memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use shortly_core::{AccessCountSink, ReadRepository, Repository, StorageError};

/// Schema for the `short_urls` table.
pub const MYSQL_SCHEMA: &str = include_str!("../ddl/mysql/short_urls.sql");
