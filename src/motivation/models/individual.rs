use super::{FactorLedger, ModelOutput, ScoringWeights};
use crate::motivation::domain::{
    MarketMomentum, NormalizedSignals, OwnerClassification, SignalField,
};

const EXPECTED_FIELDS: &[SignalField] = &[
    SignalField::OwnerName,
    SignalField::MailingAddress,
    SignalField::PropertyAddress,
    SignalField::OwnerOccupied,
    SignalField::LastSaleDate,
    SignalField::LastSalePrice,
    SignalField::EstimatedValue,
    SignalField::YoyPriceChange,
    SignalField::Permits,
    SignalField::PreForeclosure,
    SignalField::TaxDelinquent,
    SignalField::Vacant,
    SignalField::CodeLiens,
];

const HIGH_EQUITY_RATIO: f64 = 0.5;

/// Individuals sell on life events: long tenure, distress, absentee ownership and equity.
pub(super) fn score(
    signals: &NormalizedSignals,
    _classification: &OwnerClassification,
    weights: &ScoringWeights,
) -> ModelOutput {
    let w = &weights.individual;
    let mut ledger = FactorLedger::default();
    let mut risks = Vec::new();

    match signals.ownership_years() {
        Some(years) if years < 2.0 => {
            ledger.add(
                "ownership_tenure",
                w.recent_purchase,
                format!("Purchased {years:.1} years ago; recent buyers rarely resell"),
            );
            if signals.ownership.owner_occupied == Some(true) {
                ledger.add(
                    "owner_occupied_recent_purchase",
                    w.owner_occupied_short_tenure,
                    "Owner moved in recently and lives at the property",
                );
            }
        }
        Some(years) if years < 5.0 => ledger.add(
            "ownership_tenure",
            w.short_tenure,
            format!("Owned for {years:.1} years"),
        ),
        Some(years) if years < 10.0 => ledger.add(
            "ownership_tenure",
            w.mid_tenure,
            format!("Owned for {years:.1} years"),
        ),
        Some(years) if years < 20.0 => ledger.add(
            "ownership_tenure",
            w.long_tenure,
            format!("Long tenure of {years:.1} years"),
        ),
        Some(years) => ledger.add(
            "ownership_tenure",
            w.multi_decade_tenure,
            format!("Multi-decade ownership of {years:.0} years"),
        ),
        None => ledger.neutral("ownership_tenure", "Sale history unavailable"),
    }

    let distress = &signals.distress;
    if distress.pre_foreclosure {
        ledger.add(
            "pre_foreclosure",
            w.pre_foreclosure,
            "Notice of default or lis pendens on record",
        );
    }
    if distress.tax_delinquent {
        ledger.add("tax_delinquent", w.tax_delinquent, "Property taxes are delinquent");
    }
    if distress.vacant {
        ledger.add("vacant", w.vacant, "Property appears vacant");
    }
    ledger.add_counted(
        "code_liens",
        distress.code_liens,
        w.code_lien_each,
        w.code_lien_cap,
        format!("{} open code lien(s)", distress.code_liens),
    );

    if signals.ownership.out_of_state == Some(true) {
        ledger.add(
            "absentee_owner",
            w.absentee + w.out_of_state,
            "Owner lives out of state",
        );
    } else if signals.ownership.absentee == Some(true) {
        ledger.add("absentee_owner", w.absentee, "Owner does not live at the property");
    }

    match signals.valuation.equity_ratio {
        Some(ratio) if ratio >= HIGH_EQUITY_RATIO => ledger.add(
            "equity_position",
            w.high_equity,
            format!("Estimated equity of {:.0}%", ratio * 100.0),
        ),
        Some(ratio) if ratio < 0.0 => {
            ledger.add(
                "equity_position",
                w.negative_equity,
                "Estimated value is below the last sale price",
            );
            risks.push("Limited equity constrains any discounted offer".to_string());
        }
        _ => {}
    }

    let permits = &signals.permits;
    if permits.recent > 0 {
        ledger.add(
            "permit_activity",
            w.active_renovation,
            format!("{} permit(s) filed in the last year", permits.recent),
        );
    } else if permits.is_stale() && signals.ownership_years().is_some_and(|years| years >= 10.0) {
        ledger.add(
            "permit_activity",
            w.deferred_maintenance,
            "No recent permits on a long-held home suggests deferred maintenance",
        );
    }

    if signals.market.momentum == Some(MarketMomentum::Rising) {
        ledger.add(
            "market_momentum",
            w.seller_market,
            "Rising prices make cashing out attractive",
        );
    }

    ModelOutput {
        ledger,
        risks,
        expected_fields: EXPECTED_FIELDS,
    }
}
