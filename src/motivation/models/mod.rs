//! Owner-aware scoring strategies.
//!
//! The same raw fact can push different owner archetypes in opposite directions, so each
//! primary owner class has its own pure scoring function. `ScoringModels` picks one through a
//! single dispatch table and turns its factor ledger into a bounded, auditable score.

mod config;
mod individual;
mod institutional;
mod investor;

pub use config::{
    IndividualWeights, InstitutionalWeights, InvestorWeights, ScoringWeights, SubClassAdjustments,
};

use super::domain::{
    FactorImpact, NormalizedSignals, OwnerClassification, ScoreBand, ScoringFactor,
    ScoringModelKind, SignalField, StandardMotivationScore, INSUFFICIENT_DATA_RECOMMENDATION,
};

pub const BASELINE_SCORE: i32 = 50;
const INSUFFICIENT_CONFIDENCE: f32 = 0.25;
const LOW_COVERAGE_CONFIDENCE: f32 = 0.5;
const LOW_VALUATION_CONFIDENCE: f32 = 0.5;

/// What a strategy hands back before bounding and banding.
pub(crate) struct ModelOutput {
    pub(crate) ledger: FactorLedger,
    pub(crate) risks: Vec<String>,
    pub(crate) expected_fields: &'static [SignalField],
}

type ModelFn = fn(&NormalizedSignals, &OwnerClassification, &ScoringWeights) -> ModelOutput;

fn model_for(kind: ScoringModelKind) -> ModelFn {
    match kind {
        ScoringModelKind::Individual => individual::score,
        ScoringModelKind::InvestorEntity => investor::score,
        ScoringModelKind::Institutional => institutional::score,
    }
}

/// Stateless scorer applying the weight tables to normalized signals.
#[derive(Debug, Clone, Default)]
pub struct ScoringModels {
    weights: ScoringWeights,
}

impl ScoringModels {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn score(
        &self,
        signals: &NormalizedSignals,
        classification: &OwnerClassification,
    ) -> StandardMotivationScore {
        let kind = ScoringModelKind::for_class(classification.primary_class);
        let ModelOutput {
            mut ledger,
            mut risks,
            expected_fields,
        } = model_for(kind)(signals, classification, &self.weights);

        let adjustment = self.weights.sub_class.get(classification.sub_class);
        ledger.add(
            "owner_sub_class",
            adjustment,
            format!(
                "{} owners adjust the {} model by {:+} points",
                classification.sub_class.label(),
                classification.primary_class.label(),
                adjustment
            ),
        );

        let raw = BASELINE_SCORE + ledger.total();
        let bounded = raw.clamp(0, 100);
        if bounded != raw {
            ledger.add(
                "score_bounds",
                (bounded - raw) as i16,
                format!("raw score {raw} clamped into 0-100"),
            );
        }

        let score = bounded as u8;
        let confidence = round2(signals.coverage(expected_fields));
        let band = ScoreBand::from_score(score);
        let factors = ledger.into_factors();

        let recommendation = if confidence < INSUFFICIENT_CONFIDENCE
            && factors.iter().all(|factor| factor.impact == FactorImpact::Neutral)
        {
            INSUFFICIENT_DATA_RECOMMENDATION.to_string()
        } else {
            band.recommendation().to_string()
        };

        append_shared_risks(&mut risks, signals, classification, confidence);

        StandardMotivationScore {
            score,
            confidence,
            band,
            model: kind,
            factors,
            recommendation,
            risk_factors: risks,
        }
    }
}

fn append_shared_risks(
    risks: &mut Vec<String>,
    signals: &NormalizedSignals,
    classification: &OwnerClassification,
    confidence: f32,
) {
    if signals.distress.pre_foreclosure {
        risks.push("Pre-foreclosure: an auction date may preempt a negotiated sale".to_string());
    }
    if signals.distress.tax_delinquent {
        risks.push("Tax delinquency: back taxes must be paid off at closing".to_string());
    }
    if signals.distress.code_liens > 0 {
        risks.push(format!(
            "{} code lien(s) must be cleared before closing",
            signals.distress.code_liens
        ));
    }
    if signals.valuation.equity_ratio.is_some_and(|ratio| ratio < 0.0) {
        risks.push("Owner may be underwater; a short sale could be required".to_string());
    }
    if signals
        .valuation
        .confidence
        .is_some_and(|confidence| confidence < LOW_VALUATION_CONFIDENCE)
    {
        risks.push("Low-confidence valuation: verify value before pricing an offer".to_string());
    }
    if confidence < LOW_COVERAGE_CONFIDENCE {
        risks.push("Limited data coverage: verify signals before outreach".to_string());
    }
    if classification.confidence < LOW_COVERAGE_CONFIDENCE {
        risks.push("Owner type inferred from weak heuristics".to_string());
    }
}

fn round2(value: f32) -> f32 {
    ((value * 100.0).round() / 100.0).clamp(0.0, 1.0)
}

/// Ordered list of factors whose weights always sum to the delta from the baseline.
#[derive(Debug, Default)]
pub(crate) struct FactorLedger {
    factors: Vec<ScoringFactor>,
}

impl FactorLedger {
    /// Record a weighted factor; zero weights are dropped.
    pub(crate) fn add(&mut self, name: &str, weight: i16, description: impl Into<String>) {
        if weight == 0 {
            return;
        }
        self.push(name, weight, description.into());
    }

    /// Record a factor that was evaluated but moved nothing.
    pub(crate) fn neutral(&mut self, name: &str, description: impl Into<String>) {
        self.push(name, 0, description.into());
    }

    /// Like `add`, but a zero weight still leaves an audited neutral entry.
    pub(crate) fn add_or_neutral(&mut self, name: &str, weight: i16, description: impl Into<String>) {
        self.push(name, weight, description.into());
    }

    /// Per-item weight multiplied by `count`, capped in magnitude.
    pub(crate) fn add_counted(
        &mut self,
        name: &str,
        count: u32,
        each: i16,
        cap: i16,
        description: impl Into<String>,
    ) {
        if count == 0 {
            return;
        }
        let raw = i32::from(each).saturating_mul(count.min(i16::MAX as u32) as i32);
        let cap = i32::from(cap).abs().min(i32::from(i16::MAX));
        self.add(name, raw.clamp(-cap, cap) as i16, description);
    }

    fn push(&mut self, name: &str, weight: i16, description: String) {
        let weight = f64::from(weight);
        self.factors.push(ScoringFactor {
            name: name.to_string(),
            impact: FactorImpact::from_weight(weight),
            weight,
            description,
        });
    }

    pub(crate) fn total(&self) -> i32 {
        self.factors.iter().map(|factor| factor.weight as i32).sum()
    }

    pub(crate) fn into_factors(self) -> Vec<ScoringFactor> {
        self.factors
    }
}
