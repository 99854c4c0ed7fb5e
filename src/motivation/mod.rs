//! Seller motivation scoring: owner classification, multi-provider signal fetching,
//! owner-aware scoring strategies, and an optional AI-adjusted score.

pub mod classifier;
pub mod clock;
pub mod domain;
pub mod engine;
pub mod iq;
pub mod models;
pub mod router;
pub mod signals;

#[cfg(test)]
mod tests;

pub use classifier::classify;
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::{
    FactorImpact, NormalizedSignals, OwnerClassification, OwnerSubClass, PermitRecord,
    PermitStatus, PostalAddress, PrimaryOwnerClass, PropertyFacts, PropertyId,
    RawPropertySignals, ScoreBand, ScoringFactor, ScoringModelKind, SignalField,
    StandardMotivationScore,
};
pub use engine::{
    EngineConfig, MotivationEngine, MotivationError, MotivationRequest, QuickScore, ScoreType,
    ScoringResult,
};
pub use iq::{
    AdjustmentAdvisor, AdjustmentProposal, AdjustmentRequest, AdvisorError, AiAdjustment,
    DealFlowIqScore, IqStatus, OfferRange, Predictions, ProposedAdjustment, ProposedPredictions,
};
pub use models::{ScoringModels, ScoringWeights};
pub use signals::{
    FetchOptions, FetchPolicy, InMemorySignalCache, NoopSignalCache, SignalCache,
    SignalFetchResult, SignalFetcher, SignalProviders, SignalSource,
};
