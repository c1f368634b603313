use std::path::PathBuf;

use eyre::Result;

use dealer_config::{Config, OverrideMode, ProbeOrder, Strategy};
use dealer_execution::rpc::http_rpc::HttpRpc;
use dealer_execution::rpc::TestRpc;

use crate::cache::{FileCache, MemoryCache, SlotCache};
use crate::dealer::Dealer;
use crate::resolver::{AccessListResolver, LayoutResolver, SlotResolver};

/// Values set on the builder win over the ones in [`Config`], which in turn
/// defaults to [`Config::default`].
#[derive(Default)]
pub struct DealerBuilder {
    rpc_url: Option<String>,
    strategy: Option<Strategy>,
    max_slot: Option<u64>,
    cache_path: Option<PathBuf>,
    cache: Option<Box<dyn SlotCache>>,
    no_cache: bool,
    probe_order: Option<ProbeOrder>,
    override_mode: Option<OverrideMode>,
    config: Option<Config>,
}

impl DealerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rpc_url(mut self, rpc_url: &str) -> Self {
        self.rpc_url = Some(rpc_url.to_string());
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn max_slot(mut self, max_slot: u64) -> Self {
        self.max_slot = Some(max_slot);
        self
    }

    pub fn cache_path(mut self, cache_path: PathBuf) -> Self {
        self.cache_path = Some(cache_path);
        self
    }

    /// Uses `cache` for solved slots instead of the one at `cache_path`.
    pub fn cache(mut self, cache: Box<dyn SlotCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Keeps solved slots in memory only.
    pub fn no_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    pub fn probe_order(mut self, probe_order: ProbeOrder) -> Self {
        self.probe_order = Some(probe_order);
        self
    }

    pub fn override_mode(mut self, override_mode: OverrideMode) -> Self {
        self.override_mode = Some(override_mode);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Dealer<HttpRpc>> {
        let rpc_url = self
            .rpc_url
            .clone()
            .or_else(|| self.config.as_ref().map(|config| config.rpc_url.clone()))
            .unwrap_or_else(|| Config::default().rpc_url);

        let rpc = HttpRpc::new(&rpc_url)?;
        Ok(self.build_with_rpc(rpc))
    }

    /// Builds around an existing node handle, such as a mock.
    pub fn build_with_rpc<R: TestRpc>(self, rpc: R) -> Dealer<R> {
        let config = self.config.unwrap_or_default();

        let strategy = self.strategy.unwrap_or(config.strategy);
        let max_slot = self.max_slot.unwrap_or(config.max_slot);
        let resolver: Box<dyn SlotResolver<R>> = match strategy {
            Strategy::AccessList => Box::new(
                AccessListResolver::new(
                    self.probe_order.unwrap_or(config.probe_order),
                    self.override_mode.unwrap_or(config.override_mode),
                )
                .with_max_slot(max_slot),
            ),
            Strategy::BruteForce => {
                let cache_path = self.cache_path.or(config.cache_path);
                let cache: Box<dyn SlotCache> = match (self.cache, cache_path) {
                    (Some(cache), _) => cache,
                    (None, Some(path)) if !self.no_cache => Box::new(FileCache::load(path)),
                    _ => Box::<MemoryCache>::default(),
                };

                Box::new(LayoutResolver::new(cache, max_slot))
            }
        };

        Dealer::new(rpc, resolver)
    }
}
