use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::motivation::clock::ManualClock;
use crate::motivation::domain::{
    NormalizedSignals, OwnerClassification, OwnerSubClass, PermitRecord, PermitStatus,
    PostalAddress, PropertyId, RawPropertySignals,
};
use crate::motivation::engine::{EngineConfig, MotivationEngine};
use crate::motivation::iq::{AdjustmentAdvisor, AdjustmentProposal, AdjustmentRequest, AdvisorError};
use crate::motivation::signals::{
    normalize, DistressIndicators, FetchPolicy, InMemorySignalCache, MarketSnapshot,
    PermitHistory, PermitProvider, PropertyDataProvider, PropertyRecord, PropertyStore,
    ProviderError, SignalFetcher, SignalProviders, Valuation,
};

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn as_of() -> NaiveDate {
    date(2025, 10, 1)
}

pub(super) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn oak_street() -> PostalAddress {
    PostalAddress::new("12 Oak St", "Des Moines", "IA", "50309")
}

pub(super) fn elm_avenue() -> PostalAddress {
    PostalAddress::new("881 Elm Ave", "Des Moines", "IA", "50315")
}

pub(super) fn out_of_state_mailing() -> PostalAddress {
    PostalAddress::new("400 Pine Rd", "Phoenix", "AZ", "85004")
}

/// 22-year owner-occupied trust with no permits and no distress.
pub(super) fn smith_trust_record() -> PropertyRecord {
    PropertyRecord {
        owner_name: Some("Smith Family Trust".to_string()),
        mailing_address: Some(oak_street()),
        owner_occupied: Some(true),
        properties_owned: Some(1),
        last_sale_date: Some(date(2003, 6, 1)),
        last_sale_price: Some(140_000),
        estimated_value: Some(320_000),
        ..PropertyRecord::default()
    }
}

/// Out-of-state LLC with three holdings, bought eight years ago.
pub(super) fn abc_holdings_record() -> PropertyRecord {
    PropertyRecord {
        owner_name: Some("ABC Holdings LLC".to_string()),
        mailing_address: Some(out_of_state_mailing()),
        owner_occupied: Some(false),
        properties_owned: Some(3),
        last_sale_date: Some(date(2017, 9, 1)),
        last_sale_price: Some(180_000),
        estimated_value: Some(240_000),
        ..PropertyRecord::default()
    }
}

pub(super) fn softening_market() -> MarketSnapshot {
    MarketSnapshot {
        days_on_market: Some(45),
        sale_to_list_ratio: Some(0.97),
        inventory: Some(120),
        median_price: Some(235_000),
        yoy_price_change: Some(-3.5),
    }
}

pub(super) fn recent_permits() -> PermitHistory {
    PermitHistory {
        permits: vec![
            finaled_permit("roof", date(2025, 3, 10)),
            finaled_permit("kitchen remodel", date(2025, 5, 2)),
            finaled_permit("electrical", date(2025, 7, 20)),
        ],
        city_metrics: None,
    }
}

pub(super) fn finaled_permit(permit_type: &str, filed_on: NaiveDate) -> PermitRecord {
    PermitRecord {
        permit_type: permit_type.to_string(),
        status: PermitStatus::Finaled,
        filed_on: Some(filed_on),
    }
}

pub(super) fn classification(sub_class: OwnerSubClass) -> OwnerClassification {
    OwnerClassification::new(sub_class, 0.85, None)
}

pub(super) fn normalized(raw: &RawPropertySignals) -> NormalizedSignals {
    normalize(raw, as_of())
}

/// Signals with every individual-model field reported and nothing notable.
pub(super) fn quiet_signals(months_owned: u32) -> RawPropertySignals {
    let sold = as_of() - chrono::Months::new(months_owned);
    RawPropertySignals {
        owner_name: Some("Pat Doe".to_string()),
        mailing_address: Some(oak_street()),
        property_address: Some(oak_street()),
        owner_occupied: Some(true),
        properties_owned: Some(1),
        last_sale_date: Some(sold),
        last_sale_price: Some(200_000),
        estimated_value: Some(260_000),
        days_on_market: Some(40),
        sale_to_list_ratio: Some(0.98),
        yoy_price_change: Some(1.0),
        permits: Some(vec![finaled_permit("water heater", date(2024, 2, 1))]),
        pre_foreclosure: Some(false),
        tax_delinquent: Some(false),
        vacant: Some(false),
        code_liens: Some(0),
        ..RawPropertySignals::default()
    }
}

#[derive(Default)]
pub(super) struct FakePropertyData {
    records: Mutex<HashMap<String, PropertyRecord>>,
    markets: Mutex<HashMap<String, MarketSnapshot>>,
    valuations: Mutex<HashMap<String, Valuation>>,
    failure: Mutex<Option<ProviderError>>,
    pub(super) calls: AtomicUsize,
}

impl FakePropertyData {
    pub(super) fn insert(&self, address: &PostalAddress, record: PropertyRecord) {
        self.records
            .lock()
            .expect("records mutex poisoned")
            .insert(address.cache_key(), record);
    }

    pub(super) fn insert_market(&self, zip: &str, snapshot: MarketSnapshot) {
        self.markets
            .lock()
            .expect("markets mutex poisoned")
            .insert(zip.to_string(), snapshot);
    }

    pub(super) fn insert_valuation(&self, address: &PostalAddress, valuation: Valuation) {
        self.valuations
            .lock()
            .expect("valuations mutex poisoned")
            .insert(address.cache_key(), valuation);
    }

    pub(super) fn fail_with(&self, error: ProviderError) {
        *self.failure.lock().expect("failure mutex poisoned") = Some(error);
    }

    fn check(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure.lock().expect("failure mutex poisoned").clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PropertyDataProvider for FakePropertyData {
    async fn property_record(&self, address: &PostalAddress) -> Result<PropertyRecord, ProviderError> {
        self.check()?;
        self.records
            .lock()
            .expect("records mutex poisoned")
            .get(&address.cache_key())
            .cloned()
            .ok_or(ProviderError::NotFound)
    }

    async fn market_snapshot(&self, zip: &str) -> Result<MarketSnapshot, ProviderError> {
        self.check()?;
        Ok(self
            .markets
            .lock()
            .expect("markets mutex poisoned")
            .get(zip)
            .cloned()
            .unwrap_or_default())
    }

    async fn valuation(&self, address: &PostalAddress) -> Result<Option<Valuation>, ProviderError> {
        self.check()?;
        Ok(self
            .valuations
            .lock()
            .expect("valuations mutex poisoned")
            .get(&address.cache_key())
            .copied())
    }
}

#[derive(Default)]
pub(super) struct FakePermits {
    histories: Mutex<HashMap<String, PermitHistory>>,
    failure: Mutex<Option<ProviderError>>,
    pub(super) calls: AtomicUsize,
}

impl FakePermits {
    pub(super) fn insert(&self, address: &PostalAddress, history: PermitHistory) {
        self.histories
            .lock()
            .expect("permits mutex poisoned")
            .insert(address.cache_key(), history);
    }

    pub(super) fn fail_with(&self, error: ProviderError) {
        *self.failure.lock().expect("failure mutex poisoned") = Some(error);
    }
}

#[async_trait]
impl PermitProvider for FakePermits {
    async fn permit_history(&self, address: &PostalAddress) -> Result<PermitHistory, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failure.lock().expect("failure mutex poisoned").clone() {
            return Err(error);
        }
        Ok(self
            .histories
            .lock()
            .expect("permits mutex poisoned")
            .get(&address.cache_key())
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub(super) struct FakeStore {
    addresses: Mutex<HashMap<PropertyId, PostalAddress>>,
    distress: Mutex<HashMap<String, DistressIndicators>>,
    resolve_failure: Mutex<Option<ProviderError>>,
    pub(super) resolve_calls: AtomicUsize,
    pub(super) distress_calls: AtomicUsize,
}

impl FakeStore {
    pub(super) fn insert_property(&self, id: &str, address: PostalAddress) {
        self.addresses
            .lock()
            .expect("store mutex poisoned")
            .insert(PropertyId(id.to_string()), address);
    }

    /// Distress flags keyed by property id or address cache key.
    pub(super) fn insert_distress(&self, key: &str, indicators: DistressIndicators) {
        self.distress
            .lock()
            .expect("store mutex poisoned")
            .insert(key.to_string(), indicators);
    }

    pub(super) fn fail_resolution(&self, error: ProviderError) {
        *self.resolve_failure.lock().expect("store mutex poisoned") = Some(error);
    }
}

#[async_trait]
impl PropertyStore for FakeStore {
    async fn resolve_address(&self, id: &PropertyId) -> Result<Option<PostalAddress>, ProviderError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.resolve_failure.lock().expect("store mutex poisoned").clone() {
            return Err(error);
        }
        Ok(self
            .addresses
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned())
    }

    async fn distress_indicators(
        &self,
        id: Option<&PropertyId>,
        address: Option<&PostalAddress>,
    ) -> Result<DistressIndicators, ProviderError> {
        self.distress_calls.fetch_add(1, Ordering::SeqCst);
        let guard = self.distress.lock().expect("store mutex poisoned");
        let by_id = id.and_then(|id| guard.get(&id.0));
        let by_address = address.and_then(|address| guard.get(&address.cache_key()));
        Ok(by_id.or(by_address).cloned().unwrap_or_default())
    }
}

/// Advisor that answers with a fixed proposal, optionally after a delay.
pub(super) struct ScriptedAdvisor {
    response: Result<AdjustmentProposal, AdvisorError>,
    delay: Option<Duration>,
    pub(super) calls: AtomicUsize,
}

impl ScriptedAdvisor {
    pub(super) fn answering(proposal: AdjustmentProposal) -> Self {
        Self {
            response: Ok(proposal),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn failing(error: AdvisorError) -> Self {
        Self {
            response: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub(super) fn slow(proposal: AdjustmentProposal, delay: Duration) -> Self {
        Self {
            response: Ok(proposal),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AdjustmentAdvisor for ScriptedAdvisor {
    async fn propose(&self, _request: AdjustmentRequest) -> Result<AdjustmentProposal, AdvisorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.response.clone()
    }
}

/// Fakes, cache and clock wired together the way the service wires real collaborators.
pub(super) struct Harness {
    pub(super) property_data: Arc<FakePropertyData>,
    pub(super) permits: Arc<FakePermits>,
    pub(super) store: Arc<FakeStore>,
    pub(super) cache: Arc<InMemorySignalCache>,
    pub(super) clock: Arc<ManualClock>,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self {
            property_data: Arc::new(FakePropertyData::default()),
            permits: Arc::new(FakePermits::default()),
            store: Arc::new(FakeStore::default()),
            cache: Arc::new(InMemorySignalCache::new()),
            clock: Arc::new(ManualClock::new(start_time())),
        }
    }

    /// Harness preloaded with the trust and LLC properties.
    pub(super) fn seeded() -> Self {
        let harness = Self::new();
        harness.store.insert_property("prop-smith", oak_street());
        harness.property_data.insert(&oak_street(), smith_trust_record());
        harness.permits.insert(&oak_street(), PermitHistory::default());

        harness.store.insert_property("prop-abc", elm_avenue());
        harness.property_data.insert(&elm_avenue(), abc_holdings_record());
        harness.property_data.insert_market("50315", softening_market());
        harness.permits.insert(&elm_avenue(), recent_permits());
        harness
    }

    pub(super) fn providers(&self) -> SignalProviders {
        SignalProviders {
            property_data: self.property_data.clone(),
            permits: self.permits.clone(),
            store: self.store.clone(),
        }
    }

    pub(super) fn policy() -> FetchPolicy {
        FetchPolicy {
            provider_timeout: Duration::from_millis(200),
            ..FetchPolicy::default()
        }
    }

    pub(super) fn fetcher(&self) -> SignalFetcher {
        SignalFetcher::new(
            self.providers(),
            self.cache.clone(),
            self.clock.clone(),
            Self::policy(),
        )
    }

    pub(super) fn engine(&self, advisor: Option<Arc<dyn AdjustmentAdvisor>>) -> MotivationEngine {
        self.engine_with(advisor, EngineConfig::default())
    }

    pub(super) fn engine_with(
        &self,
        advisor: Option<Arc<dyn AdjustmentAdvisor>>,
        config: EngineConfig,
    ) -> MotivationEngine {
        MotivationEngine::new(self.fetcher(), advisor, config)
    }

    /// Calls to the property-data and permit providers plus distress lookups.
    pub(super) fn provider_calls(&self) -> usize {
        self.property_data.calls.load(Ordering::SeqCst)
            + self.permits.calls.load(Ordering::SeqCst)
            + self.store.distress_calls.load(Ordering::SeqCst)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 64)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
