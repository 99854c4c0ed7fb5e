use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::classifier::classify;
use super::domain::{
    NormalizedSignals, OwnerClassification, PostalAddress, PropertyFacts, PropertyId,
    StandardMotivationScore,
};
use super::iq::{
    build_iq_score, AdjustmentAdvisor, AdjustmentRequest, AdvisorError, DealFlowIqScore,
    IqStatus, DEFAULT_ADJUSTMENT_CAP,
};
use super::models::{ScoringModels, ScoringWeights};
use super::signals::{
    normalize, FetchOptions, IdentityError, SignalFetchResult, SignalFetcher, SourceError,
    SourceStatus,
};

/// Errors that reach callers. Provider, cache and advisor failures degrade the result instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MotivationError {
    #[error("an address or a property id is required")]
    MissingIdentity,
    #[error("property {property_id} has no resolvable address")]
    UnresolvableIdentity { property_id: PropertyId },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<IdentityError> for MotivationError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Missing => MotivationError::MissingIdentity,
            IdentityError::Unresolvable(property_id) => {
                MotivationError::UnresolvableIdentity { property_id }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    #[default]
    Standard,
    Iq,
    Both,
}

impl ScoreType {
    pub const fn wants_iq(self) -> bool {
        matches!(self, ScoreType::Iq | ScoreType::Both)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotivationRequest {
    #[serde(default)]
    pub property_id: Option<PropertyId>,
    #[serde(default)]
    pub address: Option<PostalAddress>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub score_type: ScoreType,
    #[serde(default)]
    pub force_refresh: bool,
    /// Date ownership and permit ages are measured against; defaults to today.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

impl MotivationRequest {
    pub fn for_property(property_id: impl Into<String>) -> Self {
        Self {
            property_id: Some(PropertyId(property_id.into())),
            ..Self::default()
        }
    }

    pub fn for_address(address: PostalAddress) -> Self {
        Self {
            address: Some(address),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), MotivationError> {
        if self
            .property_id
            .as_ref()
            .is_some_and(|id| id.0.trim().is_empty())
        {
            return Err(MotivationError::InvalidInput(
                "property_id must not be blank".to_string(),
            ));
        }
        if let Some(zip) = &self.zip {
            let digits = zip.trim();
            if digits.len() < 5 || !digits.chars().take(5).all(|c| c.is_ascii_digit()) {
                return Err(MotivationError::InvalidInput(format!(
                    "zip `{zip}` is not a postal code"
                )));
            }
        }
        Ok(())
    }

    fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            property_id: self.property_id.clone(),
            address: self.address.clone(),
            zip: self.zip.as_ref().map(|zip| zip.trim().chars().take(5).collect()),
            force_refresh: self.force_refresh,
            cache_ttl: None,
        }
    }
}

/// Composite output: the standard score always, the IQ score when requested and available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringResult {
    pub property_id: Option<PropertyId>,
    pub address: Option<PostalAddress>,
    pub owner_name: Option<String>,
    pub classification: OwnerClassification,
    pub standard: StandardMotivationScore,
    pub iq: Option<DealFlowIqScore>,
    pub iq_status: IqStatus,
    pub sources: SourceStatus,
    pub errors: Vec<SourceError>,
    pub from_cache: bool,
    pub fetched_at: DateTime<Utc>,
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickScore {
    pub score: u8,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub adjustment_cap: u8,
    pub advisor_timeout: Duration,
    pub batch_concurrency: usize,
    pub weights: ScoringWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            adjustment_cap: DEFAULT_ADJUSTMENT_CAP,
            advisor_timeout: Duration::from_secs(10),
            batch_concurrency: 4,
            weights: ScoringWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineStage {
    Resolving,
    Fetching,
    Classifying,
    ScoringStandard,
    ScoringIq,
    Complete,
}

impl PipelineStage {
    const fn label(self) -> &'static str {
        match self {
            PipelineStage::Resolving => "resolving",
            PipelineStage::Fetching => "fetching",
            PipelineStage::Classifying => "classifying",
            PipelineStage::ScoringStandard => "scoring_standard",
            PipelineStage::ScoringIq => "scoring_iq",
            PipelineStage::Complete => "complete",
        }
    }
}

fn enter(stage: PipelineStage, subject: &str) {
    debug!(stage = stage.label(), subject, "motivation pipeline stage");
}

/// Orchestrates classify, fetch, score and the optional AI adjustment for each request.
pub struct MotivationEngine {
    fetcher: SignalFetcher,
    models: ScoringModels,
    advisor: Option<Arc<dyn AdjustmentAdvisor>>,
    config: EngineConfig,
}

impl MotivationEngine {
    pub fn new(
        fetcher: SignalFetcher,
        advisor: Option<Arc<dyn AdjustmentAdvisor>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            fetcher,
            models: ScoringModels::new(config.weights.clone()),
            advisor,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &SignalFetcher {
        &self.fetcher
    }

    pub async fn calculate_seller_motivation(
        &self,
        request: &MotivationRequest,
    ) -> Result<ScoringResult, MotivationError> {
        let subject = subject_label(request);
        enter(PipelineStage::Resolving, &subject);
        request.validate()?;

        enter(PipelineStage::Fetching, &subject);
        let fetched = self
            .fetcher
            .fetch_property_signals(&request.fetch_options())
            .await?;

        let as_of = request
            .as_of
            .unwrap_or_else(|| self.fetcher.clock().now().date_naive());
        let normalized = normalize(&fetched.signals, as_of);

        enter(PipelineStage::Classifying, &subject);
        let owner_name = fetched.signals.owner_name.clone();
        let classification = classify(
            owner_name.as_deref().unwrap_or_default(),
            &PropertyFacts::from_signals(&fetched.signals),
        );

        enter(PipelineStage::ScoringStandard, &subject);
        let standard = self.models.score(&normalized, &classification);

        let (iq, iq_status) = if request.score_type.wants_iq() {
            enter(PipelineStage::ScoringIq, &subject);
            self.score_iq(&subject, &classification, &standard, normalized)
                .await
        } else {
            (None, IqStatus::NotRequested)
        };

        enter(PipelineStage::Complete, &subject);
        info!(
            subject = %subject,
            owner_class = %classification.label(),
            score = standard.score,
            confidence = standard.confidence,
            iq_score = iq.as_ref().map(|iq| iq.iq_score),
            "scored seller motivation"
        );

        let SignalFetchResult {
            signals,
            sources,
            errors,
            fetched_at,
            from_cache,
        } = fetched;

        Ok(ScoringResult {
            property_id: request.property_id.clone(),
            address: signals.property_address,
            owner_name,
            classification,
            standard,
            iq,
            iq_status,
            sources,
            errors,
            from_cache,
            fetched_at,
            as_of,
        })
    }

    /// Score every request independently; results keep the input order.
    pub async fn batch_calculate_motivation(
        &self,
        requests: Vec<MotivationRequest>,
    ) -> Vec<Result<ScoringResult, MotivationError>> {
        let concurrency = self.config.batch_concurrency.max(1);
        let total = requests.len();
        let results: Vec<_> = stream::iter(requests)
            .map(|request| async move { self.calculate_seller_motivation(&request).await })
            .buffered(concurrency)
            .collect()
            .await;

        let failed = results.iter().filter(|result| result.is_err()).count();
        info!(total, failed, "batch motivation scoring finished");
        results
    }

    pub async fn quick_score(
        &self,
        request: MotivationRequest,
    ) -> Result<QuickScore, MotivationError> {
        let request = MotivationRequest {
            score_type: ScoreType::Standard,
            ..request
        };
        let result = self.calculate_seller_motivation(&request).await?;
        Ok(QuickScore {
            score: result.standard.score,
            recommendation: result.standard.recommendation,
        })
    }

    async fn score_iq(
        &self,
        subject: &str,
        classification: &OwnerClassification,
        standard: &StandardMotivationScore,
        signals: NormalizedSignals,
    ) -> (Option<DealFlowIqScore>, IqStatus) {
        let Some(advisor) = self.advisor.as_ref() else {
            return (
                None,
                IqStatus::Unavailable {
                    reason: "no adjustment advisor configured".to_string(),
                },
            );
        };

        let estimated_value = signals.valuation.estimated_value;
        let request = AdjustmentRequest {
            property_label: subject.to_string(),
            classification: classification.clone(),
            standard_score: standard.score,
            band: standard.band,
            factors: standard.factors.clone(),
            signals,
            adjustment_cap: self.config.adjustment_cap,
        };

        let outcome = match tokio::time::timeout(self.config.advisor_timeout, advisor.propose(request))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(AdvisorError::Timeout {
                after_ms: self.config.advisor_timeout.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(proposal) => {
                let iq = build_iq_score(
                    standard,
                    proposal,
                    estimated_value,
                    self.config.adjustment_cap,
                );
                (Some(iq), IqStatus::Available)
            }
            Err(err) => {
                warn!(subject, error = %err, "IQ scoring unavailable; returning standard score only");
                (
                    None,
                    IqStatus::Unavailable {
                        reason: err.to_string(),
                    },
                )
            }
        }
    }
}

fn subject_label(request: &MotivationRequest) -> String {
    match (&request.property_id, &request.address) {
        (Some(id), _) => id.to_string(),
        (None, Some(address)) => address.to_string(),
        (None, None) => "<unidentified>".to_string(),
    }
}
