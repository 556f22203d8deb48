use std::sync::Arc;

use shortly_cache::RecentUrls;
use shortly_generator::ShortenerService;
use shortly_redirector::Redirector;

#[derive(Clone)]
pub struct AppState {
    redirector: Arc<dyn Redirector>,
    shortener: Arc<ShortenerService>,
    recent: Option<RecentUrls>,
}

impl AppState {
    pub fn new(
        redirector: Arc<dyn Redirector>,
        shortener: Arc<ShortenerService>,
        recent: Option<RecentUrls>,
    ) -> Self {
        Self {
            redirector,
            shortener,
            recent,
        }
    }

    pub fn redirector(&self) -> &dyn Redirector {
        self.redirector.as_ref()
    }

    pub fn shortener(&self) -> &ShortenerService {
        &self.shortener
    }

    /// `None` when running without Redis.
    pub fn recent(&self) -> Option<&RecentUrls> {
        self.recent.as_ref()
    }
}
