//! Signal fetching across the three external providers.
//!
//! Each provider is queried independently and concurrently; a failing source is recorded in
//! `errors` and never aborts the others. Results are cached per property.

pub mod cache;
mod merge;
pub mod normalize;
pub mod providers;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use cache::{CacheError, CacheRecord, InMemorySignalCache, NoopSignalCache, SignalCache};
pub use normalize::normalize;
pub use providers::{
    CityPermitMetrics, DistressIndicators, MarketSnapshot, PermitHistory, PermitProvider,
    PropertyDataProvider, PropertyRecord, PropertyStore, ProviderError, Valuation,
};

use super::clock::Clock;
use super::domain::{PostalAddress, PropertyId, RawPropertySignals};
use merge::{Authority, SignalMerger};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    PropertyData,
    Permits,
    DistressStore,
}

impl SignalSource {
    pub const fn label(self) -> &'static str {
        match self {
            SignalSource::PropertyData => "property_data",
            SignalSource::Permits => "permits",
            SignalSource::DistressStore => "distress_store",
        }
    }
}

/// Which sources answered successfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub property_data: bool,
    pub permits: bool,
    pub distress_store: bool,
}

impl SourceStatus {
    fn mark(&mut self, source: SignalSource) {
        match source {
            SignalSource::PropertyData => self.property_data = true,
            SignalSource::Permits => self.permits = true,
            SignalSource::DistressStore => self.distress_store = true,
        }
    }

    pub fn succeeded(&self) -> usize {
        [self.property_data, self.permits, self.distress_store]
            .iter()
            .filter(|ok| **ok)
            .count()
    }

    pub fn all(&self) -> bool {
        self.succeeded() == 3
    }

    pub fn any(&self) -> bool {
        self.succeeded() > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceError {
    pub source: SignalSource,
    pub error: String,
}

/// Timeouts, retries, and cache lifetimes applied by the fetcher.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchPolicy {
    pub cache_ttl: Duration,
    /// Lifetime for fetches where at least one source failed.
    pub partial_cache_ttl: Duration,
    pub provider_timeout: Duration,
    pub transient_retries: u8,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            partial_cache_ttl: Duration::from_secs(300),
            provider_timeout: Duration::from_secs(8),
            transient_retries: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchOptions {
    #[serde(default)]
    pub property_id: Option<PropertyId>,
    #[serde(default)]
    pub address: Option<PostalAddress>,
    /// Overrides the zip used for market aggregates.
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(skip)]
    pub cache_ttl: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalFetchResult {
    pub signals: RawPropertySignals,
    pub sources: SourceStatus,
    pub errors: Vec<SourceError>,
    pub fetched_at: DateTime<Utc>,
    pub from_cache: bool,
}

/// Identity after the resolving step. `address` is `None` only when the store was unreachable.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    pub property_id: Option<PropertyId>,
    pub address: Option<PostalAddress>,
    pub address_supplied: bool,
    pub resolution_error: Option<ProviderError>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("an address or a property id is required")]
    Missing,
    #[error("property {0} has no address on record")]
    Unresolvable(PropertyId),
}

/// Collaborators the fetcher dispatches to.
#[derive(Clone)]
pub struct SignalProviders {
    pub property_data: Arc<dyn PropertyDataProvider>,
    pub permits: Arc<dyn PermitProvider>,
    pub store: Arc<dyn PropertyStore>,
}

pub struct SignalFetcher {
    providers: SignalProviders,
    cache: Arc<dyn SignalCache>,
    clock: Arc<dyn Clock>,
    policy: FetchPolicy,
}

#[derive(Default)]
struct PropertyBundle {
    record: Option<PropertyRecord>,
    market: Option<MarketSnapshot>,
    valuation: Option<Valuation>,
}

impl SignalFetcher {
    pub fn new(
        providers: SignalProviders,
        cache: Arc<dyn SignalCache>,
        clock: Arc<dyn Clock>,
        policy: FetchPolicy,
    ) -> Self {
        Self {
            providers,
            cache,
            clock,
            policy,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetch signals for one property, serving unexpired cache records without provider calls.
    pub async fn fetch_property_signals(
        &self,
        options: &FetchOptions,
    ) -> Result<SignalFetchResult, IdentityError> {
        let key = cache_key(options)?;

        if !options.force_refresh {
            if let Some(record) = self.cached(&key).await {
                debug!(cache_key = %key, "signal cache hit");
                return Ok(SignalFetchResult {
                    signals: record.signals,
                    sources: record.sources,
                    errors: Vec::new(),
                    fetched_at: record.fetched_at,
                    from_cache: true,
                });
            }
        }

        let identity = self.resolve_identity(options).await?;
        Ok(self.fetch_resolved(&key, &identity, options).await)
    }

    /// Turn caller input into an address. A store that has no such property is fatal; a store
    /// that cannot be reached degrades to an id-only identity.
    pub async fn resolve_identity(
        &self,
        options: &FetchOptions,
    ) -> Result<ResolvedIdentity, IdentityError> {
        if let Some(address) = options.address.as_ref().filter(|address| !address.is_blank()) {
            return Ok(ResolvedIdentity {
                property_id: options.property_id.clone(),
                address: Some(address.clone()),
                address_supplied: true,
                resolution_error: None,
            });
        }

        let Some(property_id) = options.property_id.clone() else {
            return Err(IdentityError::Missing);
        };

        let resolution = self
            .guarded(SignalSource::DistressStore, "resolve_address", || {
                self.providers.store.resolve_address(&property_id)
            })
            .await;

        match resolution {
            Ok(Some(address)) => Ok(ResolvedIdentity {
                property_id: Some(property_id),
                address: Some(address),
                address_supplied: false,
                resolution_error: None,
            }),
            Ok(None) | Err(ProviderError::NotFound) => {
                Err(IdentityError::Unresolvable(property_id))
            }
            Err(err) => {
                warn!(property_id = %property_id, error = %err, "address resolution failed; continuing by id");
                Ok(ResolvedIdentity {
                    property_id: Some(property_id),
                    address: None,
                    address_supplied: false,
                    resolution_error: Some(err),
                })
            }
        }
    }

    async fn fetch_resolved(
        &self,
        key: &str,
        identity: &ResolvedIdentity,
        options: &FetchOptions,
    ) -> SignalFetchResult {
        let address = identity.address.as_ref();
        let zip = options
            .zip
            .clone()
            .or_else(|| address.and_then(|address| address.zip5().map(str::to_string)));

        let (property, permits, distress) = tokio::join!(
            self.fetch_property_data(identity, zip.as_deref()),
            self.fetch_permits(identity),
            self.guarded(SignalSource::DistressStore, "distress_indicators", || {
                self.providers
                    .store
                    .distress_indicators(identity.property_id.as_ref(), address)
            }),
        );

        let mut sources = SourceStatus::default();
        let mut errors = Vec::new();
        let mut merger = SignalMerger::new();

        if let Some(address) = identity.address.clone() {
            let level = if identity.address_supplied {
                Authority::Dedicated
            } else {
                Authority::Derived
            };
            merger.property_address(address, level);
        }

        match distress {
            Ok(indicators) => {
                sources.mark(SignalSource::DistressStore);
                merger.distress(indicators);
            }
            Err(err) => errors.push(SourceError {
                source: SignalSource::DistressStore,
                error: err.to_string(),
            }),
        }

        let (bundle, property_errors) = property;
        if bundle.record.is_some() || bundle.market.is_some() || bundle.valuation.is_some() {
            sources.mark(SignalSource::PropertyData);
        }
        if let Some(valuation) = bundle.valuation {
            merger.valuation(valuation);
        }
        if let Some(record) = bundle.record {
            merger.record(record);
        }
        if let Some(market) = bundle.market {
            merger.market(market);
        }
        errors.extend(property_errors.into_iter().map(|error| SourceError {
            source: SignalSource::PropertyData,
            error,
        }));

        match permits {
            Ok(history) => {
                sources.mark(SignalSource::Permits);
                merger.permits(history);
            }
            Err(error) => errors.push(SourceError {
                source: SignalSource::Permits,
                error,
            }),
        }

        for failure in &errors {
            warn!(
                cache_key = %key,
                source = failure.source.label(),
                error = %failure.error,
                "signal source failed"
            );
        }

        let fetched_at = self.clock.now();
        let signals = merger.finish();

        if sources.any() {
            self.store_record(key, &signals, sources, fetched_at, options)
                .await;
        }

        info!(
            cache_key = %key,
            sources_ok = sources.succeeded(),
            errors = errors.len(),
            "fetched property signals"
        );

        SignalFetchResult {
            signals,
            sources,
            errors,
            fetched_at,
            from_cache: false,
        }
    }

    async fn fetch_property_data(
        &self,
        identity: &ResolvedIdentity,
        zip: Option<&str>,
    ) -> (PropertyBundle, Vec<String>) {
        let Some(address) = identity.address.as_ref() else {
            return (PropertyBundle::default(), vec![skipped_message(identity)]);
        };
        let provider = &self.providers.property_data;

        let (record, market, valuation) = tokio::join!(
            self.guarded(SignalSource::PropertyData, "property_record", || {
                provider.property_record(address)
            }),
            async {
                match zip {
                    Some(zip) => {
                        self.guarded(SignalSource::PropertyData, "market_snapshot", || {
                            provider.market_snapshot(zip)
                        })
                        .await
                        .map(Some)
                    }
                    None => Ok(None),
                }
            },
            self.guarded(SignalSource::PropertyData, "valuation", || {
                provider.valuation(address)
            }),
        );

        let mut bundle = PropertyBundle::default();
        let mut errors = Vec::new();
        match record {
            Ok(record) => bundle.record = Some(record),
            Err(err) => errors.push(format!("property record: {err}")),
        }
        match market {
            Ok(market) => bundle.market = market,
            Err(err) => errors.push(format!("market snapshot: {err}")),
        }
        match valuation {
            Ok(valuation) => bundle.valuation = valuation,
            Err(err) => errors.push(format!("valuation: {err}")),
        }
        (bundle, errors)
    }

    async fn fetch_permits(&self, identity: &ResolvedIdentity) -> Result<PermitHistory, String> {
        let Some(address) = identity.address.as_ref() else {
            return Err(skipped_message(identity));
        };
        self.guarded(SignalSource::Permits, "permit_history", || {
            self.providers.permits.permit_history(address)
        })
        .await
        .map_err(|err| err.to_string())
    }

    async fn cached(&self, key: &str) -> Option<CacheRecord> {
        match self.cache.get(key, self.clock.now()).await {
            Ok(record) => record,
            Err(err) => {
                warn!(cache_key = %key, error = %err, "signal cache read failed; treating as miss");
                None
            }
        }
    }

    async fn store_record(
        &self,
        key: &str,
        signals: &RawPropertySignals,
        sources: SourceStatus,
        fetched_at: DateTime<Utc>,
        options: &FetchOptions,
    ) {
        let full_ttl = options.cache_ttl.unwrap_or(self.policy.cache_ttl);
        let ttl = if sources.all() {
            full_ttl
        } else {
            self.policy.partial_cache_ttl.min(full_ttl)
        };
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));

        let record = CacheRecord {
            key: key.to_string(),
            signals: signals.clone(),
            sources,
            fetched_at,
            expires_at: fetched_at + ttl,
        };

        if let Err(err) = self.cache.put(record).await {
            warn!(cache_key = %key, error = %err, "signal cache write failed");
        }
    }

    /// Run a provider call under the policy timeout, retrying transient failures.
    async fn guarded<T, F, Fut>(
        &self,
        source: SignalSource,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt: u8 = 0;
        loop {
            let outcome = match tokio::time::timeout(self.policy.provider_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout {
                    after_ms: self.policy.provider_timeout.as_millis() as u64,
                }),
            };

            match outcome {
                Err(err) if err.is_transient() && attempt < self.policy.transient_retries => {
                    attempt += 1;
                    debug!(
                        source = source.label(),
                        operation,
                        attempt,
                        error = %err,
                        "retrying transient provider failure"
                    );
                }
                other => return other,
            }
        }
    }
}

fn cache_key(options: &FetchOptions) -> Result<String, IdentityError> {
    if let Some(id) = &options.property_id {
        return Ok(id.0.clone());
    }
    match &options.address {
        Some(address) if !address.is_blank() => Ok(address.cache_key()),
        _ => Err(IdentityError::Missing),
    }
}

fn skipped_message(identity: &ResolvedIdentity) -> String {
    match &identity.resolution_error {
        Some(err) => format!("skipped: address unresolved ({err})"),
        None => "skipped: address unresolved".to_string(),
    }
}
