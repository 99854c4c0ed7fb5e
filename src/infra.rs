use async_trait::async_trait;
use chrono::NaiveDate;
use dealflow::config::AppConfig;
use dealflow::error::AppError;
use dealflow::motivation::domain::{MarketMomentum, PrimaryOwnerClass};
use dealflow::motivation::signals::{
    DistressIndicators, MarketSnapshot, PermitHistory, PermitProvider, PropertyDataProvider,
    PropertyRecord, PropertyStore, ProviderError, Valuation,
};
use dealflow::motivation::{
    AdjustmentAdvisor, AdjustmentProposal, AdjustmentRequest, AdvisorError, InMemorySignalCache,
    MotivationEngine, PostalAddress, PropertyId, ProposedAdjustment, ScoringWeights,
    SignalFetcher, SignalProviders, SystemClock,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

const DEMO_FIXTURES: &str = include_str!("../fixtures/demo_properties.json");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Property data served by the fixture-backed providers.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct FixtureDataset {
    #[serde(default)]
    pub(crate) properties: Vec<FixtureProperty>,
    #[serde(default)]
    pub(crate) markets: HashMap<String, MarketSnapshot>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FixtureProperty {
    pub(crate) id: String,
    pub(crate) address: PostalAddress,
    #[serde(default)]
    pub(crate) record: Option<PropertyRecord>,
    #[serde(default)]
    pub(crate) valuation: Option<Valuation>,
    #[serde(default)]
    pub(crate) permits: Option<PermitHistory>,
    #[serde(default)]
    pub(crate) distress: DistressIndicators,
}

impl FixtureDataset {
    pub(crate) fn demo() -> Result<Self, AppError> {
        Ok(serde_json::from_str(DEMO_FIXTURES)?)
    }

    pub(crate) fn from_path(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub(crate) fn load(path: Option<&Path>) -> Result<Self, AppError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::demo(),
        }
    }
}

/// Serves all three provider contracts from an in-memory dataset.
pub(crate) struct FixtureProviders {
    properties: Vec<FixtureProperty>,
    markets: HashMap<String, MarketSnapshot>,
    by_id: HashMap<PropertyId, usize>,
    by_address: HashMap<String, usize>,
}

impl FixtureProviders {
    pub(crate) fn new(dataset: FixtureDataset) -> Self {
        let mut by_id = HashMap::new();
        let mut by_address = HashMap::new();
        for (index, property) in dataset.properties.iter().enumerate() {
            by_id.insert(PropertyId(property.id.clone()), index);
            by_address.insert(property.address.cache_key(), index);
        }
        Self {
            properties: dataset.properties,
            markets: dataset.markets,
            by_id,
            by_address,
        }
    }

    fn at_address(&self, address: &PostalAddress) -> Result<&FixtureProperty, ProviderError> {
        self.by_address
            .get(&address.cache_key())
            .map(|index| &self.properties[*index])
            .ok_or(ProviderError::NotFound)
    }
}

#[async_trait]
impl PropertyDataProvider for FixtureProviders {
    async fn property_record(&self, address: &PostalAddress) -> Result<PropertyRecord, ProviderError> {
        self.at_address(address)?
            .record
            .clone()
            .ok_or(ProviderError::NotFound)
    }

    async fn market_snapshot(&self, zip: &str) -> Result<MarketSnapshot, ProviderError> {
        self.markets.get(zip).cloned().ok_or(ProviderError::NotFound)
    }

    async fn valuation(&self, address: &PostalAddress) -> Result<Option<Valuation>, ProviderError> {
        Ok(self
            .at_address(address)
            .ok()
            .and_then(|property| property.valuation))
    }
}

#[async_trait]
impl PermitProvider for FixtureProviders {
    async fn permit_history(&self, address: &PostalAddress) -> Result<PermitHistory, ProviderError> {
        self.at_address(address)?
            .permits
            .clone()
            .ok_or(ProviderError::NotFound)
    }
}

#[async_trait]
impl PropertyStore for FixtureProviders {
    async fn resolve_address(&self, id: &PropertyId) -> Result<Option<PostalAddress>, ProviderError> {
        Ok(self
            .by_id
            .get(id)
            .map(|index| self.properties[*index].address.clone()))
    }

    async fn distress_indicators(
        &self,
        id: Option<&PropertyId>,
        address: Option<&PostalAddress>,
    ) -> Result<DistressIndicators, ProviderError> {
        let index = id
            .and_then(|id| self.by_id.get(id))
            .or_else(|| address.and_then(|address| self.by_address.get(&address.cache_key())));
        Ok(index
            .map(|index| self.properties[*index].distress.clone())
            .unwrap_or_default())
    }
}

/// Rules-based stand-in for the AI adjustment service.
#[derive(Debug, Default)]
pub(crate) struct HeuristicAdvisor;

#[async_trait]
impl AdjustmentAdvisor for HeuristicAdvisor {
    async fn propose(&self, request: AdjustmentRequest) -> Result<AdjustmentProposal, AdvisorError> {
        let signals = &request.signals;
        let mut adjustments = Vec::new();

        if signals.distress.vacant && signals.distress.tax_delinquent {
            adjustments.push(ProposedAdjustment {
                factor: "compounding carrying costs".to_string(),
                adjustment: 8,
                reasoning: "Vacant and tax delinquent: holding costs accrue with no income"
                    .to_string(),
            });
        }
        if signals
            .valuation
            .equity_ratio
            .is_some_and(|ratio| ratio > 0.6)
        {
            adjustments.push(ProposedAdjustment {
                factor: "pricing flexibility".to_string(),
                adjustment: 4,
                reasoning: "Deep equity leaves room to accept a discounted offer".to_string(),
            });
        }
        if request.classification.primary_class == PrimaryOwnerClass::InvestorEntity
            && signals.market.momentum == Some(MarketMomentum::Rising)
        {
            adjustments.push(ProposedAdjustment {
                factor: "appreciation hold".to_string(),
                adjustment: -5,
                reasoning: "Investors tend to ride rising markets".to_string(),
            });
        }

        Ok(AdjustmentProposal {
            adjustments,
            ..AdjustmentProposal::default()
        })
    }
}

/// Wire the engine against fixture providers with the configured policies.
pub(crate) fn build_engine(
    config: &AppConfig,
    dataset: FixtureDataset,
    weights: Option<ScoringWeights>,
) -> MotivationEngine {
    let fixtures = Arc::new(FixtureProviders::new(dataset));
    let providers = SignalProviders {
        property_data: fixtures.clone(),
        permits: fixtures.clone(),
        store: fixtures,
    };
    let fetcher = SignalFetcher::new(
        providers,
        Arc::new(InMemorySignalCache::new()),
        Arc::new(SystemClock),
        config.scoring.fetch_policy(),
    );

    let mut engine_config = config.scoring.engine_config();
    if let Some(weights) = weights {
        engine_config.weights = weights;
    }

    MotivationEngine::new(fetcher, Some(Arc::new(HeuristicAdvisor)), engine_config)
}

pub(crate) fn load_weights(path: Option<&Path>) -> Result<Option<ScoringWeights>, AppError> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Ok(Some(serde_json::from_str(&raw)?))
        }
        None => Ok(None),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|raw| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_fixtures_parse_and_index_every_property() {
        let dataset = FixtureDataset::demo().expect("demo fixtures parse");
        let providers = FixtureProviders::new(dataset);
        assert_eq!(providers.by_id.len(), providers.properties.len());
        assert_eq!(providers.by_address.len(), providers.properties.len());
        assert!(providers.markets.contains_key("50315"));
    }

    #[tokio::test]
    async fn fixture_store_resolves_known_ids_only() {
        let providers = FixtureProviders::new(FixtureDataset::demo().expect("demo fixtures"));
        let known = providers
            .resolve_address(&PropertyId("prop-abc".to_string()))
            .await
            .expect("store answers");
        assert_eq!(known.map(|address| address.zip), Some("50315".to_string()));

        let unknown = providers
            .resolve_address(&PropertyId("prop-none".to_string()))
            .await
            .expect("store answers");
        assert!(unknown.is_none());
    }
}
