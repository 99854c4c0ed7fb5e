use super::{FactorLedger, ModelOutput, ScoringWeights};
use crate::motivation::domain::{NormalizedSignals, OwnerClassification, SignalField};

const EXPECTED_FIELDS: &[SignalField] = &[
    SignalField::OwnerName,
    SignalField::MailingAddress,
    SignalField::PropertiesOwned,
    SignalField::LastSaleDate,
    SignalField::EstimatedValue,
    SignalField::DaysOnMarket,
    SignalField::SaleToListRatio,
    SignalField::YoyPriceChange,
    SignalField::Permits,
    SignalField::PreForeclosure,
    SignalField::TaxDelinquent,
    SignalField::CodeLiens,
];

/// Investors sell on market conditions and portfolio strategy. Tenure works against motivation:
/// a long hold means the asset is performing.
pub(super) fn score(
    signals: &NormalizedSignals,
    _classification: &OwnerClassification,
    weights: &ScoringWeights,
) -> ModelOutput {
    let w = &weights.investor;
    let mut ledger = FactorLedger::default();
    let mut risks = Vec::new();

    match signals.ownership_years() {
        Some(years) if years < 3.0 => ledger.add_or_neutral(
            "holding_period",
            w.early_hold,
            format!("Early in the hold at {years:.1} years"),
        ),
        Some(years) if years < 7.0 => ledger.add(
            "holding_period",
            w.mid_hold,
            format!("Mid-cycle hold of {years:.1} years"),
        ),
        Some(years) if years < 15.0 => ledger.add(
            "holding_period",
            w.long_hold,
            format!("Stabilized hold of {years:.1} years"),
        ),
        Some(years) => ledger.add(
            "holding_period",
            w.legacy_hold,
            format!("Legacy hold of {years:.0} years"),
        ),
        None => ledger.neutral("holding_period", "Acquisition date unavailable"),
    }

    let market = &signals.market;
    match market.yoy_price_change {
        Some(change) if change < -5.0 => ledger.add(
            "market_trend",
            w.declining_market,
            format!("Prices down {:.1}% year over year", change.abs()),
        ),
        Some(change) if change < 0.0 => ledger.add(
            "market_trend",
            w.softening_market,
            format!("Prices softening {:.1}% year over year", change.abs()),
        ),
        Some(change) if change > 5.0 => ledger.add(
            "market_trend",
            w.rising_market,
            format!("Prices up {change:.1}% year over year"),
        ),
        Some(_) => ledger.neutral("market_trend", "Prices roughly flat year over year"),
        None => {}
    }

    match market.days_on_market {
        Some(days) if days > 90 => ledger.add(
            "submarket_velocity",
            w.slow_submarket,
            format!("Listings sit {days} days on market"),
        ),
        Some(days) if days > 60 => ledger.add(
            "submarket_velocity",
            w.sluggish_submarket,
            format!("Listings take {days} days to sell"),
        ),
        Some(days) if days < 20 => ledger.add(
            "submarket_velocity",
            w.hot_submarket,
            format!("Hot submarket at {days} days on market"),
        ),
        _ => {}
    }

    if let Some(ratio) = market.sale_to_list_ratio.filter(|ratio| *ratio < 0.95) {
        ledger.add(
            "sale_to_list",
            w.below_list_sales,
            format!("Homes closing at {:.0}% of list", ratio * 100.0),
        );
    }

    let permits = &signals.permits;
    if permits.is_stale() {
        ledger.add(
            "capital_reinvestment",
            w.no_reinvestment,
            "No permitted improvements in three years",
        );
    }
    if permits.stalled > 0 {
        ledger.add(
            "stalled_permits",
            w.stalled_permits,
            format!("{} permit(s) open for more than six months", permits.stalled),
        );
        risks.push("Open permits may need to be closed out or transferred".to_string());
    }
    if permits.recent >= 3 {
        ledger.add(
            "renovation_burst",
            w.renovation_burst,
            format!("{} permits in the last year suggests prep for resale", permits.recent),
        );
    }

    match signals.ownership.properties_owned {
        Some(count) if count >= 10 => ledger.add(
            "portfolio_size",
            w.large_portfolio,
            format!("Portfolio of {count} properties; open to rebalancing"),
        ),
        Some(count) if count >= 3 => ledger.add(
            "portfolio_size",
            w.multi_property,
            format!("Holds {count} properties"),
        ),
        Some(2) => ledger.add("portfolio_size", w.second_property, "Holds a second property"),
        _ => {}
    }

    if signals.ownership.out_of_state == Some(true) {
        ledger.add(
            "remote_management",
            w.absentee + w.out_of_state,
            "Managed from out of state",
        );
    } else if signals.ownership.absentee == Some(true) {
        ledger.add("remote_management", w.absentee, "Owner manages remotely");
    }

    let distress = &signals.distress;
    if distress.pre_foreclosure {
        ledger.add("pre_foreclosure", w.pre_foreclosure, "Lender has started foreclosure");
    }
    if distress.tax_delinquent {
        ledger.add("tax_delinquent", w.tax_delinquent, "Carrying costs are going unpaid");
    }
    if distress.vacant {
        ledger.add("vacant", w.vacant, "Unit is vacant and not producing income");
    }
    ledger.add_counted(
        "code_liens",
        distress.code_liens,
        w.code_lien_each,
        w.code_lien_cap,
        format!("{} open code lien(s)", distress.code_liens),
    );

    ModelOutput {
        ledger,
        risks,
        expected_fields: EXPECTED_FIELDS,
    }
}
