use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("worker is already running")]
    AlreadyStarted,
    #[error("worker is not running")]
    NotRunning,
}
