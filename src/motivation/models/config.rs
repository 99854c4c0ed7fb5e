use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::motivation::domain::OwnerSubClass;

/// Weight tables for every scoring strategy. Values are whole points added to the baseline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub individual: IndividualWeights,
    pub investor: InvestorWeights,
    pub institutional: InstitutionalWeights,
    pub sub_class: SubClassAdjustments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndividualWeights {
    pub recent_purchase: i16,
    pub short_tenure: i16,
    pub mid_tenure: i16,
    pub long_tenure: i16,
    pub multi_decade_tenure: i16,
    pub owner_occupied_short_tenure: i16,
    pub pre_foreclosure: i16,
    pub tax_delinquent: i16,
    pub vacant: i16,
    pub code_lien_each: i16,
    pub code_lien_cap: i16,
    pub absentee: i16,
    pub out_of_state: i16,
    pub high_equity: i16,
    pub negative_equity: i16,
    pub deferred_maintenance: i16,
    pub active_renovation: i16,
    pub seller_market: i16,
}

impl Default for IndividualWeights {
    fn default() -> Self {
        Self {
            recent_purchase: -10,
            short_tenure: -3,
            mid_tenure: 4,
            long_tenure: 10,
            multi_decade_tenure: 15,
            owner_occupied_short_tenure: -10,
            pre_foreclosure: 20,
            tax_delinquent: 15,
            vacant: 10,
            code_lien_each: 3,
            code_lien_cap: 9,
            absentee: 6,
            out_of_state: 4,
            high_equity: 5,
            negative_equity: -4,
            deferred_maintenance: 3,
            active_renovation: -4,
            seller_market: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvestorWeights {
    pub early_hold: i16,
    pub mid_hold: i16,
    pub long_hold: i16,
    pub legacy_hold: i16,
    pub declining_market: i16,
    pub softening_market: i16,
    pub rising_market: i16,
    pub slow_submarket: i16,
    pub sluggish_submarket: i16,
    pub hot_submarket: i16,
    pub below_list_sales: i16,
    pub no_reinvestment: i16,
    pub stalled_permits: i16,
    pub renovation_burst: i16,
    pub large_portfolio: i16,
    pub multi_property: i16,
    pub second_property: i16,
    pub absentee: i16,
    pub out_of_state: i16,
    pub pre_foreclosure: i16,
    pub tax_delinquent: i16,
    pub vacant: i16,
    pub code_lien_each: i16,
    pub code_lien_cap: i16,
}

impl Default for InvestorWeights {
    fn default() -> Self {
        Self {
            early_hold: 0,
            mid_hold: -3,
            long_hold: -6,
            legacy_hold: -10,
            declining_market: 12,
            softening_market: 7,
            rising_market: -4,
            slow_submarket: 8,
            sluggish_submarket: 5,
            hot_submarket: -2,
            below_list_sales: 4,
            no_reinvestment: 6,
            stalled_permits: 4,
            renovation_burst: 4,
            large_portfolio: 10,
            multi_property: 7,
            second_property: 3,
            absentee: 5,
            out_of_state: 3,
            pre_foreclosure: 15,
            tax_delinquent: 12,
            vacant: 8,
            code_lien_each: 3,
            code_lien_cap: 9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstitutionalWeights {
    pub code_lien_each: i16,
    pub code_lien_cap: i16,
    pub holding_long: i16,
    pub holding_mid: i16,
    pub holding_short: i16,
    pub stalled_permit_each: i16,
    pub stalled_permit_cap: i16,
    pub stale_listing: i16,
    pub slow_listing: i16,
    pub vacant: i16,
    pub tax_delinquent: i16,
    pub pre_foreclosure: i16,
    pub soft_market: i16,
}

impl Default for InstitutionalWeights {
    fn default() -> Self {
        Self {
            code_lien_each: 5,
            code_lien_cap: 20,
            holding_long: 15,
            holding_mid: 10,
            holding_short: 5,
            stalled_permit_each: 4,
            stalled_permit_cap: 12,
            stale_listing: 8,
            slow_listing: 4,
            vacant: 8,
            tax_delinquent: 10,
            pre_foreclosure: 10,
            soft_market: 5,
        }
    }
}

/// Extra points per sub-class on top of the primary-class model. Meant to be tuned
/// empirically; absent entries contribute nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubClassAdjustments(pub BTreeMap<OwnerSubClass, i16>);

impl SubClassAdjustments {
    pub fn get(&self, sub_class: OwnerSubClass) -> i16 {
        self.0.get(&sub_class).copied().unwrap_or(0)
    }
}

impl Default for SubClassAdjustments {
    fn default() -> Self {
        Self(BTreeMap::from([
            (OwnerSubClass::Inherited, 10),
            (OwnerSubClass::TrustLiving, 2),
            (OwnerSubClass::TrustIrrevocable, -2),
            (OwnerSubClass::SmallInvestor, 2),
            (OwnerSubClass::Corporate, -3),
            (OwnerSubClass::BankReo, 8),
            (OwnerSubClass::GovernmentFederal, -5),
            (OwnerSubClass::GovernmentState, -5),
            (OwnerSubClass::GovernmentLocal, -5),
            (OwnerSubClass::TaxLien, 10),
            (OwnerSubClass::EstateProbate, 12),
            (OwnerSubClass::EstateExecutor, 10),
        ]))
    }
}
