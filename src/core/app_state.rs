#[derive(Clone)]
pub struct AppState {
    pub http_client: reqwest::Client,
    /// Fetched-page cache keyed by `"{source}:{path}"`. `None` when the
    /// configured TTL is 0 (caching disabled).
    pub page_cache: Option<moka::future::Cache<String, crate::fetch::FetchedPage>>,
    // Concurrency control for outbound fetches
    pub outbound_limit: std::sync::Arc<tokio::sync::Semaphore>,
    /// Ordered fetch strategies, tried first to last per mirror URL.
    pub strategies: Vec<std::sync::Arc<dyn crate::fetch::FetchStrategy>>,
    /// Streaming-server ranker, built once from the configured weight table.
    pub ranker: std::sync::Arc<crate::rank::Ranker>,
    /// Source module serving the anime routes (`/api/read` always goes to komiku).
    pub source: String,
    /// File-based config loaded from `animein.json` (env-var fallback for all fields).
    pub config: std::sync::Arc<crate::core::config::AnimeinConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strategies: Vec<&'static str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("AppState")
            .field("source", &self.source)
            .field("strategies", &strategies)
            .field("cache_enabled", &self.page_cache.is_some())
            .finish()
    }
}

impl AppState {
    pub fn new(http_client: reqwest::Client) -> Self {
        let config = crate::core::config::load_config();

        let source = {
            let name = config.resolve_source();
            if crate::sources::by_name(&name).is_some() {
                name
            } else {
                tracing::warn!("unknown source `{}`; falling back to kuramanime", name);
                "kuramanime".to_string()
            }
        };

        let strategies = crate::fetch::build_strategies(&config);
        let ranker = std::sync::Arc::new(crate::rank::Ranker::new(config.rank.clone()));

        let ttl = config.resolve_cache_ttl_secs();
        let page_cache = (ttl > 0).then(|| {
            moka::future::Cache::builder()
                .max_capacity(1_000)
                .time_to_live(std::time::Duration::from_secs(ttl))
                .build()
        });

        Self {
            http_client,
            page_cache,
            outbound_limit: std::sync::Arc::new(tokio::sync::Semaphore::new(
                config.resolve_outbound_limit(),
            )),
            strategies,
            ranker,
            source,
            config: std::sync::Arc::new(config),
        }
    }
}
