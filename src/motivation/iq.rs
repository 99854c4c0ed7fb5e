//! AI-adjusted ("IQ") scoring on top of a standard score.
//!
//! The advisor is an untrusted remote collaborator: its proposals are validated and clamped
//! before they touch the score, and missing predictions fall back to band defaults.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{
    NormalizedSignals, OwnerClassification, ScoreBand, ScoringFactor, StandardMotivationScore,
};

pub const DEFAULT_ADJUSTMENT_CAP: u8 = 15;
pub const MAX_ADJUSTMENTS: usize = 5;

/// Input handed to the advisor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustmentRequest {
    pub property_label: String,
    pub classification: OwnerClassification,
    pub standard_score: u8,
    pub band: ScoreBand,
    pub factors: Vec<ScoringFactor>,
    pub signals: NormalizedSignals,
    pub adjustment_cap: u8,
}

/// One adjustment as proposed by the advisor, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAdjustment {
    pub factor: String,
    pub adjustment: i32,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposedPredictions {
    pub time_to_decision: Option<String>,
    pub best_approach_timing: Option<String>,
    pub optimal_offer_range: Option<OfferRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjustmentProposal {
    pub adjustments: Vec<ProposedAdjustment>,
    pub predictions: ProposedPredictions,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvisorError {
    #[error("advisor unavailable: {0}")]
    Unavailable(String),
    #[error("advisor returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("advisor timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
}

/// AI-adjustment collaborator contract.
#[async_trait]
pub trait AdjustmentAdvisor: Send + Sync {
    async fn propose(&self, request: AdjustmentRequest) -> Result<AdjustmentProposal, AdvisorError>;
}

/// A validated adjustment. `proposed` keeps the advisor's raw number for auditing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAdjustment {
    pub factor: String,
    pub adjustment: i8,
    pub proposed: i32,
    pub clamped: bool,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRange {
    pub min: u64,
    pub max: u64,
}

impl OfferRange {
    fn normalized(self) -> Self {
        if self.min <= self.max {
            self
        } else {
            Self {
                min: self.max,
                max: self.min,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predictions {
    pub time_to_decision: String,
    pub best_approach_timing: String,
    pub optimal_offer_range: Option<OfferRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealFlowIqScore {
    pub iq_score: u8,
    pub base_score: u8,
    pub ai_adjustments: Vec<AiAdjustment>,
    pub predictions: Predictions,
}

/// Whether an IQ score accompanies the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IqStatus {
    NotRequested,
    Available,
    Unavailable { reason: String },
}

/// Clamp and trim advisor proposals: at most `MAX_ADJUSTMENTS`, each within `±cap`, blank
/// factor names dropped.
pub fn validate_adjustments(proposed: Vec<ProposedAdjustment>, cap: u8) -> Vec<AiAdjustment> {
    let cap = i32::from(cap.min(i8::MAX as u8));
    proposed
        .into_iter()
        .filter(|adjustment| !adjustment.factor.trim().is_empty())
        .take(MAX_ADJUSTMENTS)
        .map(|adjustment| {
            let bounded = adjustment.adjustment.clamp(-cap, cap);
            AiAdjustment {
                factor: adjustment.factor.trim().to_string(),
                adjustment: bounded as i8,
                proposed: adjustment.adjustment,
                clamped: bounded != adjustment.adjustment,
                reasoning: adjustment.reasoning,
            }
        })
        .collect()
}

/// Merge a validated proposal into the standard score.
pub fn build_iq_score(
    standard: &StandardMotivationScore,
    proposal: AdjustmentProposal,
    estimated_value: Option<u64>,
    cap: u8,
) -> DealFlowIqScore {
    let ai_adjustments = validate_adjustments(proposal.adjustments, cap);
    let delta: i32 = ai_adjustments
        .iter()
        .map(|adjustment| i32::from(adjustment.adjustment))
        .sum();
    let iq_score = (i32::from(standard.score) + delta).clamp(0, 100) as u8;

    // Predictions follow the adjusted band so they agree with the number shown.
    let band = ScoreBand::from_score(iq_score);
    let predicted = proposal.predictions;
    let predictions = Predictions {
        time_to_decision: predicted
            .time_to_decision
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| default_time_to_decision(band).to_string()),
        best_approach_timing: predicted
            .best_approach_timing
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| default_approach_timing(band).to_string()),
        optimal_offer_range: predicted
            .optimal_offer_range
            .map(OfferRange::normalized)
            .or_else(|| default_offer_range(band, estimated_value)),
    };

    DealFlowIqScore {
        iq_score,
        base_score: standard.score,
        ai_adjustments,
        predictions,
    }
}

pub fn default_time_to_decision(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::VeryHigh => "0-30 days",
        ScoreBand::High => "30-60 days",
        ScoreBand::Moderate => "60-120 days",
        ScoreBand::Low => "4-9 months",
        ScoreBand::VeryLow => "9+ months",
    }
}

pub fn default_approach_timing(band: ScoreBand) -> &'static str {
    match band {
        ScoreBand::VeryHigh => "Immediately",
        ScoreBand::High => "Within 1 week",
        ScoreBand::Moderate => "Within 30 days",
        ScoreBand::Low => "Next quarterly touch",
        ScoreBand::VeryLow => "Re-evaluate in 6 months",
    }
}

/// Offer range as a share of estimated value; more motivated owners accept deeper discounts.
pub fn default_offer_range(band: ScoreBand, estimated_value: Option<u64>) -> Option<OfferRange> {
    let value = estimated_value.filter(|value| *value > 0)? as f64;
    let (low, high) = match band {
        ScoreBand::VeryHigh => (0.65, 0.75),
        ScoreBand::High => (0.70, 0.80),
        ScoreBand::Moderate => (0.75, 0.85),
        ScoreBand::Low => (0.80, 0.90),
        ScoreBand::VeryLow => (0.85, 0.95),
    };
    Some(OfferRange {
        min: (value * low).round() as u64,
        max: (value * high).round() as u64,
    })
}
