use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::motivation::domain::{PermitRecord, PostalAddress, PropertyId};

/// Owner and transaction record returned by the property/market data provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyRecord {
    pub owner_name: Option<String>,
    pub owner_type: Option<String>,
    pub mailing_address: Option<PostalAddress>,
    pub owner_occupied: Option<bool>,
    pub properties_owned: Option<u32>,
    pub last_sale_date: Option<NaiveDate>,
    pub last_sale_price: Option<u64>,
    /// Generic estimate bundled with the record; the valuation endpoint supersedes it.
    pub estimated_value: Option<u64>,
    pub assessed_value: Option<u64>,
    pub vacant: Option<bool>,
}

/// Zip-level market aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSnapshot {
    pub days_on_market: Option<u32>,
    pub sale_to_list_ratio: Option<f64>,
    pub inventory: Option<u32>,
    pub median_price: Option<u64>,
    pub yoy_price_change: Option<f64>,
}

/// Output of the dedicated valuation endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub value: u64,
    #[serde(default)]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermitHistory {
    pub permits: Vec<PermitRecord>,
    pub city_metrics: Option<CityPermitMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityPermitMetrics {
    pub median_days_to_issue: Option<u32>,
}

/// Distress flags held by the persistent store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistressIndicators {
    pub pre_foreclosure: Option<bool>,
    pub tax_delinquent: Option<bool>,
    pub vacant: Option<bool>,
    pub code_liens: Option<u32>,
}

/// Property/market data provider contract.
#[async_trait]
pub trait PropertyDataProvider: Send + Sync {
    async fn property_record(&self, address: &PostalAddress) -> Result<PropertyRecord, ProviderError>;
    async fn market_snapshot(&self, zip: &str) -> Result<MarketSnapshot, ProviderError>;
    async fn valuation(&self, address: &PostalAddress) -> Result<Option<Valuation>, ProviderError>;
}

/// Permit/condition data provider contract.
#[async_trait]
pub trait PermitProvider: Send + Sync {
    async fn permit_history(&self, address: &PostalAddress) -> Result<PermitHistory, ProviderError>;
}

/// Persistent store contract: identity resolution and distress indicators.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// `Ok(None)` means the store has no such property.
    async fn resolve_address(&self, id: &PropertyId) -> Result<Option<PostalAddress>, ProviderError>;

    async fn distress_indicators(
        &self,
        id: Option<&PropertyId>,
        address: Option<&PostalAddress>,
    ) -> Result<DistressIndicators, ProviderError>;
}

/// Error raised by an external signal provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
    #[error("no record found")]
    NotFound,
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Worth another attempt within the same request.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::Unavailable(_) | ProviderError::Timeout { .. }
        )
    }
}
