use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for properties tracked by the persistent store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(pub String);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Street address as reported by providers or supplied by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub line1: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip: String,
}

impl PostalAddress {
    pub fn new(
        line1: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        Self {
            line1: line1.into(),
            city: city.into(),
            state: state.into(),
            zip: zip.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.line1.trim().is_empty() && self.zip.trim().is_empty()
    }

    /// First five digits of the postal code, when one is present.
    pub fn zip5(&self) -> Option<&str> {
        let zip = self.zip.trim();
        if zip.len() >= 5 && zip.is_char_boundary(5) {
            Some(&zip[..5])
        } else if zip.is_empty() {
            None
        } else {
            Some(zip)
        }
    }

    /// Whether two addresses point at the same parcel. Unknown zips do not disqualify a match.
    pub fn same_location(&self, other: &PostalAddress) -> bool {
        if normalize_line(&self.line1) != normalize_line(&other.line1) {
            return false;
        }
        match (self.zip5(), other.zip5()) {
            (Some(left), Some(right)) => left == right,
            _ => true,
        }
    }

    /// `None` when either side is missing a state.
    pub fn same_state(&self, other: &PostalAddress) -> Option<bool> {
        let left = self.state.trim();
        let right = other.state.trim();
        if left.is_empty() || right.is_empty() {
            return None;
        }
        Some(left.eq_ignore_ascii_case(right))
    }

    pub fn cache_key(&self) -> String {
        format!(
            "addr:{}|{}",
            normalize_line(&self.line1),
            self.zip5().unwrap_or_default()
        )
    }
}

impl fmt::Display for PostalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.line1.trim())?;
        if !self.city.trim().is_empty() {
            write!(f, ", {}", self.city.trim())?;
        }
        if !self.state.trim().is_empty() {
            write!(f, ", {}", self.state.trim())?;
        }
        if !self.zip.trim().is_empty() {
            write!(f, " {}", self.zip.trim())?;
        }
        Ok(())
    }
}

pub(crate) fn normalize_line(raw: &str) -> String {
    raw.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_uppercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Top-level owner archetype; selects the scoring strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryOwnerClass {
    Individual,
    InvestorEntity,
    InstitutionalDistressed,
}

impl PrimaryOwnerClass {
    pub const fn label(self) -> &'static str {
        match self {
            PrimaryOwnerClass::Individual => "individual",
            PrimaryOwnerClass::InvestorEntity => "investor_entity",
            PrimaryOwnerClass::InstitutionalDistressed => "institutional_distressed",
        }
    }
}

/// Fine-grained owner archetype. Every sub-class belongs to exactly one primary class.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum OwnerSubClass {
    OwnerOccupied,
    Absentee,
    OutOfState,
    Inherited,
    TrustLiving,
    SmallInvestor,
    PortfolioInvestor,
    LlcSingle,
    LlcMulti,
    Corporate,
    TrustIrrevocable,
    BankReo,
    GovernmentFederal,
    GovernmentState,
    GovernmentLocal,
    TaxLien,
    EstateProbate,
    EstateExecutor,
}

impl OwnerSubClass {
    pub const fn primary(self) -> PrimaryOwnerClass {
        match self {
            OwnerSubClass::OwnerOccupied
            | OwnerSubClass::Absentee
            | OwnerSubClass::OutOfState
            | OwnerSubClass::Inherited
            | OwnerSubClass::TrustLiving => PrimaryOwnerClass::Individual,
            OwnerSubClass::SmallInvestor
            | OwnerSubClass::PortfolioInvestor
            | OwnerSubClass::LlcSingle
            | OwnerSubClass::LlcMulti
            | OwnerSubClass::Corporate
            | OwnerSubClass::TrustIrrevocable => PrimaryOwnerClass::InvestorEntity,
            OwnerSubClass::BankReo
            | OwnerSubClass::GovernmentFederal
            | OwnerSubClass::GovernmentState
            | OwnerSubClass::GovernmentLocal
            | OwnerSubClass::TaxLien
            | OwnerSubClass::EstateProbate
            | OwnerSubClass::EstateExecutor => PrimaryOwnerClass::InstitutionalDistressed,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            OwnerSubClass::OwnerOccupied => "owner_occupied",
            OwnerSubClass::Absentee => "absentee",
            OwnerSubClass::OutOfState => "out_of_state",
            OwnerSubClass::Inherited => "inherited",
            OwnerSubClass::TrustLiving => "trust_living",
            OwnerSubClass::SmallInvestor => "small_investor",
            OwnerSubClass::PortfolioInvestor => "portfolio_investor",
            OwnerSubClass::LlcSingle => "llc_single",
            OwnerSubClass::LlcMulti => "llc_multi",
            OwnerSubClass::Corporate => "corporate",
            OwnerSubClass::TrustIrrevocable => "trust_irrevocable",
            OwnerSubClass::BankReo => "bank_reo",
            OwnerSubClass::GovernmentFederal => "government_federal",
            OwnerSubClass::GovernmentState => "government_state",
            OwnerSubClass::GovernmentLocal => "government_local",
            OwnerSubClass::TaxLien => "tax_lien",
            OwnerSubClass::EstateProbate => "estate_probate",
            OwnerSubClass::EstateExecutor => "estate_executor",
        }
    }
}

/// Classifier output; the primary class is always derived from the sub-class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerClassification {
    pub primary_class: PrimaryOwnerClass,
    pub sub_class: OwnerSubClass,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
}

impl OwnerClassification {
    pub fn new(sub_class: OwnerSubClass, confidence: f32, matched_pattern: Option<String>) -> Self {
        Self {
            primary_class: sub_class.primary(),
            sub_class,
            confidence: confidence.clamp(0.0, 1.0),
            matched_pattern,
        }
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.primary_class.label(), self.sub_class.label())
    }
}

/// Owner and parcel facts the classifier consults when the name alone is not decisive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyFacts {
    pub property_address: Option<PostalAddress>,
    pub mailing_address: Option<PostalAddress>,
    pub owner_occupied: Option<bool>,
    pub properties_owned: Option<u32>,
    pub owner_type: Option<String>,
    pub last_sale_price: Option<u64>,
}

impl PropertyFacts {
    pub fn from_signals(signals: &RawPropertySignals) -> Self {
        Self {
            property_address: signals.property_address.clone(),
            mailing_address: signals.mailing_address.clone(),
            owner_occupied: signals.owner_occupied,
            properties_owned: signals.properties_owned,
            owner_type: signals.owner_type.clone(),
            last_sale_price: signals.last_sale_price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitStatus {
    Applied,
    Issued,
    Active,
    Finaled,
    Expired,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl PermitStatus {
    /// Work that has been filed but not closed out.
    pub const fn is_open(self) -> bool {
        matches!(
            self,
            PermitStatus::Applied | PermitStatus::Issued | PermitStatus::Active
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitRecord {
    pub permit_type: String,
    pub status: PermitStatus,
    pub filed_on: Option<NaiveDate>,
}

/// Names every raw signal field so coverage and merge authority can refer to them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SignalField {
    OwnerName,
    OwnerType,
    MailingAddress,
    PropertyAddress,
    OwnerOccupied,
    PropertiesOwned,
    LastSaleDate,
    LastSalePrice,
    EstimatedValue,
    AssessedValue,
    DaysOnMarket,
    SaleToListRatio,
    Inventory,
    MedianPrice,
    YoyPriceChange,
    Permits,
    PreForeclosure,
    TaxDelinquent,
    Vacant,
    CodeLiens,
}

/// Sparse signal bag. `None` means "not reported", never "zero".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPropertySignals {
    pub owner_name: Option<String>,
    pub owner_type: Option<String>,
    pub mailing_address: Option<PostalAddress>,
    pub property_address: Option<PostalAddress>,
    pub owner_occupied: Option<bool>,
    pub properties_owned: Option<u32>,
    pub last_sale_date: Option<NaiveDate>,
    pub last_sale_price: Option<u64>,
    pub estimated_value: Option<u64>,
    /// Provider confidence in the dedicated valuation, 0..1.
    pub valuation_confidence: Option<f32>,
    pub assessed_value: Option<u64>,
    pub days_on_market: Option<u32>,
    pub sale_to_list_ratio: Option<f64>,
    pub inventory: Option<u32>,
    pub median_price: Option<u64>,
    /// Percent, e.g. `-4.5` for a 4.5% decline.
    pub yoy_price_change: Option<f64>,
    pub permits: Option<Vec<PermitRecord>>,
    /// City-wide median days from permit application to issue.
    pub permit_issue_days: Option<u32>,
    pub pre_foreclosure: Option<bool>,
    pub tax_delinquent: Option<bool>,
    pub vacant: Option<bool>,
    pub code_liens: Option<u32>,
}

impl RawPropertySignals {
    pub fn has(&self, field: SignalField) -> bool {
        match field {
            SignalField::OwnerName => self
                .owner_name
                .as_deref()
                .is_some_and(|name| !name.trim().is_empty()),
            SignalField::OwnerType => self.owner_type.is_some(),
            SignalField::MailingAddress => self.mailing_address.is_some(),
            SignalField::PropertyAddress => self.property_address.is_some(),
            SignalField::OwnerOccupied => self.owner_occupied.is_some(),
            SignalField::PropertiesOwned => self.properties_owned.is_some(),
            SignalField::LastSaleDate => self.last_sale_date.is_some(),
            SignalField::LastSalePrice => self.last_sale_price.is_some(),
            SignalField::EstimatedValue => self.estimated_value.is_some(),
            SignalField::AssessedValue => self.assessed_value.is_some(),
            SignalField::DaysOnMarket => self.days_on_market.is_some(),
            SignalField::SaleToListRatio => self.sale_to_list_ratio.is_some(),
            SignalField::Inventory => self.inventory.is_some(),
            SignalField::MedianPrice => self.median_price.is_some(),
            SignalField::YoyPriceChange => self.yoy_price_change.is_some(),
            SignalField::Permits => self.permits.is_some(),
            SignalField::PreForeclosure => self.pre_foreclosure.is_some(),
            SignalField::TaxDelinquent => self.tax_delinquent.is_some(),
            SignalField::Vacant => self.vacant.is_some(),
            SignalField::CodeLiens => self.code_liens.is_some(),
        }
    }

    pub fn present_fields(&self) -> BTreeSet<SignalField> {
        ALL_SIGNAL_FIELDS
            .iter()
            .copied()
            .filter(|field| self.has(*field))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.present_fields().is_empty()
    }
}

pub(crate) const ALL_SIGNAL_FIELDS: [SignalField; 20] = [
    SignalField::OwnerName,
    SignalField::OwnerType,
    SignalField::MailingAddress,
    SignalField::PropertyAddress,
    SignalField::OwnerOccupied,
    SignalField::PropertiesOwned,
    SignalField::LastSaleDate,
    SignalField::LastSalePrice,
    SignalField::EstimatedValue,
    SignalField::AssessedValue,
    SignalField::DaysOnMarket,
    SignalField::SaleToListRatio,
    SignalField::Inventory,
    SignalField::MedianPrice,
    SignalField::YoyPriceChange,
    SignalField::Permits,
    SignalField::PreForeclosure,
    SignalField::TaxDelinquent,
    SignalField::Vacant,
    SignalField::CodeLiens,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketMomentum {
    Declining,
    Flat,
    Rising,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnershipProfile {
    pub months_since_sale: Option<u32>,
    pub owner_occupied: Option<bool>,
    pub absentee: Option<bool>,
    pub out_of_state: Option<bool>,
    pub properties_owned: Option<u32>,
    pub nominal_transfer: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuationProfile {
    pub estimated_value: Option<u64>,
    pub last_sale_price: Option<u64>,
    pub equity_ratio: Option<f64>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketConditions {
    pub days_on_market: Option<u32>,
    pub sale_to_list_ratio: Option<f64>,
    pub inventory: Option<u32>,
    pub median_price: Option<u64>,
    pub yoy_price_change: Option<f64>,
    pub momentum: Option<MarketMomentum>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermitActivity {
    pub known: bool,
    pub total: u32,
    pub recent: u32,
    pub stalled: u32,
    pub months_since_latest: Option<u32>,
    pub median_days_to_issue: Option<u32>,
}

impl PermitActivity {
    /// Permit history was reported and shows no dated work in the last three years.
    pub fn is_stale(&self) -> bool {
        self.known && self.months_since_latest.map_or(true, |months| months > 36)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistressFlags {
    pub pre_foreclosure: bool,
    pub tax_delinquent: bool,
    pub vacant: bool,
    pub code_liens: u32,
}

impl DistressFlags {
    pub fn any(&self) -> bool {
        self.pre_foreclosure || self.tax_delinquent || self.vacant || self.code_liens > 0
    }
}

/// Signals rescaled into comparable units; the only place defaults are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSignals {
    pub as_of: NaiveDate,
    pub ownership: OwnershipProfile,
    pub valuation: ValuationProfile,
    pub market: MarketConditions,
    pub permits: PermitActivity,
    pub distress: DistressFlags,
    pub present: BTreeSet<SignalField>,
}

impl NormalizedSignals {
    pub fn ownership_years(&self) -> Option<f64> {
        self.ownership
            .months_since_sale
            .map(|months| f64::from(months) / 12.0)
    }

    /// Fraction of `expected` fields that were actually reported.
    pub fn coverage(&self, expected: &[SignalField]) -> f32 {
        if expected.is_empty() {
            return 0.0;
        }
        let present = expected
            .iter()
            .filter(|field| self.present.contains(field))
            .count();
        present as f32 / expected.len() as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorImpact {
    Positive,
    Negative,
    Neutral,
}

impl FactorImpact {
    pub fn from_weight(weight: f64) -> Self {
        if weight > 0.0 {
            FactorImpact::Positive
        } else if weight < 0.0 {
            FactorImpact::Negative
        } else {
            FactorImpact::Neutral
        }
    }
}

/// Discrete contribution to a score; weights sum to the delta from the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringFactor {
    pub name: String,
    pub impact: FactorImpact,
    pub weight: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringModelKind {
    Individual,
    InvestorEntity,
    Institutional,
}

impl ScoringModelKind {
    pub const fn for_class(class: PrimaryOwnerClass) -> Self {
        match class {
            PrimaryOwnerClass::Individual => ScoringModelKind::Individual,
            PrimaryOwnerClass::InvestorEntity => ScoringModelKind::InvestorEntity,
            PrimaryOwnerClass::InstitutionalDistressed => ScoringModelKind::Institutional,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl ScoreBand {
    pub const fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => ScoreBand::VeryHigh,
            65..=79 => ScoreBand::High,
            50..=64 => ScoreBand::Moderate,
            35..=49 => ScoreBand::Low,
            _ => ScoreBand::VeryLow,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ScoreBand::VeryHigh => "very_high",
            ScoreBand::High => "high",
            ScoreBand::Moderate => "moderate",
            ScoreBand::Low => "low",
            ScoreBand::VeryLow => "very_low",
        }
    }

    pub const fn recommendation(self) -> &'static str {
        match self {
            ScoreBand::VeryHigh => {
                "Very high motivation: prioritize immediate outreach with a direct cash offer."
            }
            ScoreBand::High => {
                "High motivation: contact within the week and lead with a flexible closing timeline."
            }
            ScoreBand::Moderate => {
                "Moderate motivation: open a conversation and nurture with monthly follow-ups."
            }
            ScoreBand::Low => {
                "Low motivation: keep on a quarterly drip and watch for new distress signals."
            }
            ScoreBand::VeryLow => {
                "Very low motivation: deprioritize and re-score when new data arrives."
            }
        }
    }
}

pub const INSUFFICIENT_DATA_RECOMMENDATION: &str =
    "Insufficient data: verify ownership and distress details before prioritizing outreach.";

/// Deterministic, rules-based motivation score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardMotivationScore {
    pub score: u8,
    pub confidence: f32,
    pub band: ScoreBand,
    pub model: ScoringModelKind,
    pub factors: Vec<ScoringFactor>,
    pub recommendation: String,
    pub risk_factors: Vec<String>,
}

impl StandardMotivationScore {
    /// Sum of factor weights; equals `score - baseline` for every model output.
    pub fn factor_total(&self) -> f64 {
        self.factors.iter().map(|factor| factor.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_classes_map_to_one_primary_class() {
        assert_eq!(
            OwnerSubClass::TrustLiving.primary(),
            PrimaryOwnerClass::Individual
        );
        assert_eq!(
            OwnerSubClass::LlcMulti.primary(),
            PrimaryOwnerClass::InvestorEntity
        );
        assert_eq!(
            OwnerSubClass::EstateProbate.primary(),
            PrimaryOwnerClass::InstitutionalDistressed
        );
    }

    #[test]
    fn score_bands_follow_thresholds() {
        assert_eq!(ScoreBand::from_score(80), ScoreBand::VeryHigh);
        assert_eq!(ScoreBand::from_score(79), ScoreBand::High);
        assert_eq!(ScoreBand::from_score(65), ScoreBand::High);
        assert_eq!(ScoreBand::from_score(50), ScoreBand::Moderate);
        assert_eq!(ScoreBand::from_score(35), ScoreBand::Low);
        assert_eq!(ScoreBand::from_score(34), ScoreBand::VeryLow);
    }

    #[test]
    fn addresses_compare_on_normalized_line_and_zip() {
        let site = PostalAddress::new("12 Oak St.", "Des Moines", "IA", "50309-1234");
        let mailing = PostalAddress::new("12 OAK ST", "Des Moines", "ia", "50309");
        assert!(site.same_location(&mailing));
        assert_eq!(site.same_state(&mailing), Some(true));
        assert_eq!(site.cache_key(), "addr:12 OAK ST|50309");

        let elsewhere = PostalAddress::new("9 Elm Ave", "Omaha", "NE", "68102");
        assert!(!site.same_location(&elsewhere));
        assert_eq!(site.same_state(&elsewhere), Some(false));
    }

    #[test]
    fn missing_and_zero_signals_stay_distinct() {
        let mut signals = RawPropertySignals::default();
        assert!(signals.is_empty());
        signals.code_liens = Some(0);
        assert!(signals.has(SignalField::CodeLiens));
        assert!(!signals.has(SignalField::Vacant));
    }
}
