use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bigdecimal::BigDecimal;
use chrono::{DateTime, Datelike, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::Shared;
use futures::FutureExt;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::external::market_data::{ExternalDividendEvent, MarketDataProvider};
use crate::services::rate_limiter::RateLimiter;

#[derive(Clone)]
struct Cached<T> {
    value: T,
    fetched_at: Instant,
    ttl: Duration,
}

impl<T> Cached<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
            ttl,
        }
    }

    fn fresh(&self) -> bool {
        self.fetched_at.elapsed() < self.ttl
    }
}

type SharedFetch<T> = Shared<Pin<Box<dyn Future<Output = T> + Send>>>;

// Collapses concurrent lookups for the same key into one in-flight provider
// call. The entry is dropped once the call settles, success or failure, so a
// failed fetch is never pinned as a shared result.
struct Coalescer<T: Clone> {
    pending: DashMap<String, SharedFetch<T>>,
}

impl<T: Clone + Send + Sync + 'static> Coalescer<T> {
    fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    async fn run<F>(&self, key: &str, fetch: F) -> T
    where
        F: Future<Output = T> + Send + 'static,
    {
        let shared = match self.pending.entry(key.to_string()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                let shared = fetch.boxed().shared();
                slot.insert(shared.clone());
                shared
            }
        };

        let value = shared.clone().await;
        // Only evict our own entry; a newer in-flight call under the same key
        // must stay pending.
        self.pending.remove_if(key, |_, current| current.ptr_eq(&shared));
        value
    }
}

/// Front door for all market data. Wraps the provider with per-symbol TTL
/// caching, in-flight request de-duplication, rate limiting, and linear
/// retry/backoff for spot quotes. Provider failures surface as `None` or an
/// empty collection, which callers must read as "unknown", not "zero".
pub struct MarketDataGateway {
    provider: Arc<dyn MarketDataProvider>,
    limiter: Arc<RateLimiter>,
    config: GatewayConfig,
    price_cache: Arc<DashMap<String, Cached<BigDecimal>>>,
    dividend_cache: Arc<DashMap<String, Cached<Vec<ExternalDividendEvent>>>>,
    closes_cache: Arc<DashMap<String, Cached<HashMap<String, BigDecimal>>>>,
    pending_prices: Coalescer<Option<BigDecimal>>,
    pending_dividends: Coalescer<Vec<ExternalDividendEvent>>,
    pending_closes: Coalescer<HashMap<String, BigDecimal>>,
}

impl MarketDataGateway {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: GatewayConfig) -> Arc<Self> {
        let price_cache = Arc::new(DashMap::new());
        let dividend_cache = Arc::new(DashMap::new());
        let closes_cache = Arc::new(DashMap::new());

        spawn_sweep(price_cache.clone(), config.cache_ttl);
        spawn_sweep(dividend_cache.clone(), config.cache_ttl);
        spawn_sweep(closes_cache.clone(), config.cache_ttl);

        let limiter = Arc::new(RateLimiter::new(
            config.max_concurrent_requests,
            config.min_request_delay,
        ));

        Arc::new(Self {
            provider,
            limiter,
            config,
            price_cache,
            dividend_cache,
            closes_cache,
            pending_prices: Coalescer::new(),
            pending_dividends: Coalescer::new(),
            pending_closes: Coalescer::new(),
        })
    }

    /// Latest quote for `symbol`, or `None` when the provider cannot supply
    /// one after retries.
    pub async fn current_price(&self, symbol: &str) -> Option<BigDecimal> {
        let symbol = normalize_symbol(symbol)?;

        if let Some(hit) = self.price_cache.get(&symbol) {
            if hit.fresh() {
                return Some(hit.value.clone());
            }
        }

        let provider = self.provider.clone();
        let limiter = self.limiter.clone();
        let cache = self.price_cache.clone();
        let ttl = self.config.cache_ttl;
        let max_retries = self.config.max_retries.max(1);
        let retry_delay = self.config.retry_delay;
        let sym = symbol.clone();

        let fetch = async move {
            let mut attempt = 1u32;
            loop {
                let result = {
                    let _permit = limiter.acquire().await;
                    provider.quote(&sym).await
                };
                match result {
                    Ok(price) => {
                        cache.insert(sym.clone(), Cached::new(price.clone(), ttl));
                        return Some(price);
                    }
                    Err(e) if attempt < max_retries => {
                        debug!(
                            "Quote fetch for {} failed on attempt {}/{}: {}",
                            sym, attempt, max_retries, e
                        );
                        sleep(retry_delay * attempt).await;
                        attempt += 1;
                    }
                    Err(e) => {
                        warn!("Failed to fetch price for {}: {}", sym, e);
                        return None;
                    }
                }
            }
        };

        self.pending_prices.run(&symbol, fetch).await
    }

    /// Dividend events for `symbol` over `[from, to]`. Empty on provider
    /// failure.
    pub async fn dividend_events(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<ExternalDividendEvent> {
        let Some(symbol) = normalize_symbol(symbol) else {
            return Vec::new();
        };
        let key = window_key(&symbol, from, to);

        if let Some(hit) = self.dividend_cache.get(&key) {
            if hit.fresh() {
                return hit.value.clone();
            }
        }

        let provider = self.provider.clone();
        let limiter = self.limiter.clone();
        let cache = self.dividend_cache.clone();
        let ttl = self.config.cache_ttl;
        let sym = symbol.clone();
        let cache_key = key.clone();

        let fetch = async move {
            let result = {
                let _permit = limiter.acquire().await;
                provider.dividend_events(&sym, from, to).await
            };
            match result {
                Ok(events) => {
                    cache.insert(cache_key, Cached::new(events.clone(), ttl));
                    events
                }
                Err(e) => {
                    warn!("Failed to fetch dividend events for {}: {}", sym, e);
                    Vec::new()
                }
            }
        };

        self.pending_dividends.run(&key, fetch).await
    }

    /// Month-end closes for `symbol` over `[from, to]`, keyed by "YYYY-MM".
    /// Empty on provider failure.
    pub async fn monthly_closes(
        &self,
        symbol: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> HashMap<String, BigDecimal> {
        let Some(symbol) = normalize_symbol(symbol) else {
            return HashMap::new();
        };
        let key = window_key(&symbol, from, to);

        if let Some(hit) = self.closes_cache.get(&key) {
            if hit.fresh() {
                return hit.value.clone();
            }
        }

        let provider = self.provider.clone();
        let limiter = self.limiter.clone();
        let cache = self.closes_cache.clone();
        let ttl = self.config.cache_ttl;
        let sym = symbol.clone();
        let cache_key = key.clone();

        let fetch = async move {
            let result = {
                let _permit = limiter.acquire().await;
                provider.monthly_history(&sym, from, to).await
            };
            match result {
                Ok(points) => {
                    let map: HashMap<String, BigDecimal> = points
                        .into_iter()
                        .map(|p| (month_key(p.date), p.close))
                        .collect();
                    cache.insert(cache_key, Cached::new(map.clone(), ttl));
                    map
                }
                Err(e) => {
                    warn!("Failed to fetch monthly closes for {}: {}", sym, e);
                    HashMap::new()
                }
            }
        };

        self.pending_closes.run(&key, fetch).await
    }
}

pub fn month_key(date: DateTime<Utc>) -> String {
    format!("{}-{:02}", date.year(), date.month())
}

fn normalize_symbol(symbol: &str) -> Option<String> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

fn window_key(symbol: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    format!("{}:{}:{}", symbol, from.timestamp(), to.timestamp())
}

fn spawn_sweep<T: Send + Sync + 'static>(
    cache: Arc<DashMap<String, Cached<T>>>,
    every: Duration,
) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.tick().await; // the first tick completes immediately
        loop {
            tick.tick().await;
            cache.retain(|_, entry| entry.fresh());
        }
    });
}
