use std::sync::Arc;

use anyhow::Context;
use shortly_cache::{InMemoryCounterStore, MokaUrlCache, RecentUrls, RedisCounterStore, RedisUrlCache};
use shortly_core::{AccessCountSink, CounterStore, ReadRepository, Repository, UrlCache};
use shortly_generator::ShortenerService;
use shortly_redirector::{RedirectorService, SideEffects, SideEffectsConfig};
use shortly_storage::{InMemoryRepository, MySqlRepository};
use shortly_worker::{AccessSyncWorker, WorkerConfig};
use tracing::info;

use crate::cli::{Cli, StorageBackendArg};
use crate::state::AppState;

/// Everything the gateway runs: URL creation, the redirect path with its
/// side-effect queue, and the access sync worker.
pub struct Services {
    pub shortener: Arc<ShortenerService>,
    pub redirector: Arc<RedirectorService>,
    pub side_effects: Arc<SideEffects>,
    pub worker: AccessSyncWorker,
    pub recent: Option<RecentUrls>,
}

struct Volatile {
    cache: Arc<dyn UrlCache>,
    counters: Arc<dyn CounterStore>,
    recent: Option<RecentUrls>,
}

struct Durable {
    reader: Arc<dyn ReadRepository>,
    writer: Arc<dyn Repository>,
    sink: Arc<dyn AccessCountSink>,
}

impl Durable {
    fn from_repository<R: Repository + AccessCountSink>(repository: R) -> Self {
        let repository = Arc::new(repository);
        Self {
            reader: repository.clone(),
            writer: repository.clone(),
            sink: repository,
        }
    }
}

async fn volatile(redis_url: Option<&str>) -> anyhow::Result<Volatile> {
    let Some(url) = redis_url else {
        info!("no redis configured, keeping cache and counters in memory");
        return Ok(Volatile {
            cache: Arc::new(MokaUrlCache::new()),
            counters: Arc::new(InMemoryCounterStore::new()),
            recent: None,
        });
    };

    let client = redis::Client::open(url).context("invalid redis url")?;
    let conn = client
        .get_multiplexed_async_connection()
        .await
        .context("failed to connect to redis")?;
    info!("connected to redis");

    Ok(Volatile {
        cache: Arc::new(RedisUrlCache::new(conn.clone())),
        counters: Arc::new(RedisCounterStore::new(conn.clone())),
        recent: Some(RecentUrls::new(conn)),
    })
}

async fn durable(cli: &Cli) -> anyhow::Result<Durable> {
    match cli.storage {
        StorageBackendArg::InMemory => {
            info!("using in-memory storage");
            Ok(Durable::from_repository(InMemoryRepository::new()))
        }
        StorageBackendArg::Mysql => {
            let dsn = cli
                .mysql_dsn
                .as_deref()
                .context("--mysql-dsn is required for mysql storage")?;
            let repository = MySqlRepository::connect(dsn)
                .await
                .context("failed to connect to mysql")?;
            repository
                .ensure_schema()
                .await
                .context("failed to apply mysql schema")?;
            info!("using mysql storage");
            Ok(Durable::from_repository(repository))
        }
    }
}

impl Services {
    pub async fn build(cli: &Cli) -> anyhow::Result<Self> {
        let volatile = volatile(cli.redis_url.as_deref()).await?;
        let durable = durable(cli).await?;

        let side_effects = Arc::new(SideEffects::spawn(
            SideEffectsConfig::default(),
            volatile.cache.clone(),
            volatile.counters.clone(),
            volatile.recent.clone(),
        ));
        let redirector = Arc::new(RedirectorService::new(
            durable.reader,
            volatile.cache,
            side_effects.clone(),
        ));

        let config = WorkerConfig::builder()
            .interval(cli.sync_interval())
            .pass_timeout(cli.sync_timeout())
            .concurrency(cli.sync_concurrency)
            .build();
        let worker = AccessSyncWorker::new(volatile.counters, durable.sink, config);

        Ok(Self {
            shortener: Arc::new(ShortenerService::new(durable.writer)),
            redirector,
            side_effects,
            worker,
            recent: volatile.recent,
        })
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.redirector.clone(),
            self.shortener.clone(),
            self.recent.clone(),
        )
    }
}
