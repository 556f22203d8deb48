//! Write-behind reconciliation of access counters.
//!
//! Redirects bump a volatile counter per slug. [`AccessSyncWorker`]
//! periodically drains every counter and adds the drained value to the
//! durable `access_count`, restoring the counter when the durable write
//! fails so the next pass can retry it.

mod config;
mod error;
mod pass;
mod worker;

pub use config::WorkerConfig;
pub use error::{Result, WorkerError};
pub use pass::PassReport;
pub use worker::AccessSyncWorker;
