use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;

pub const LISTEN_ADDR_ENV: &str = "SHORTLY_LISTEN_ADDR";
pub const REDIS_URL_ENV: &str = "SHORTLY_REDIS_URL";
pub const STORAGE_BACKEND_ENV: &str = "SHORTLY_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "SHORTLY_MYSQL_DSN";
pub const SYNC_INTERVAL_ENV: &str = "SHORTLY_SYNC_INTERVAL_SECS";
pub const SYNC_TIMEOUT_ENV: &str = "SHORTLY_SYNC_TIMEOUT_SECS";
pub const SYNC_CONCURRENCY_ENV: &str = "SHORTLY_SYNC_CONCURRENCY";
pub const LOG_FORMAT_ENV: &str = "SHORTLY_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60 * 60;
pub const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 5 * 60;
pub const DEFAULT_SYNC_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "shortly-gateway")]
pub struct Cli {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Redis holding the URL cache, access counters and recent list. Without
    /// it everything is kept in process memory.
    #[arg(long, env = REDIS_URL_ENV)]
    pub redis_url: Option<String>,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = SYNC_INTERVAL_ENV, default_value_t = DEFAULT_SYNC_INTERVAL_SECS)]
    pub sync_interval_secs: u64,

    #[arg(long, env = SYNC_TIMEOUT_ENV, default_value_t = DEFAULT_SYNC_TIMEOUT_SECS)]
    pub sync_timeout_secs: u64,

    #[arg(long, env = SYNC_CONCURRENCY_ENV, default_value_t = DEFAULT_SYNC_CONCURRENCY)]
    pub sync_concurrency: usize,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs.max(1))
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs.max(1))
    }
}
