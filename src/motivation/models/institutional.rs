use super::{FactorLedger, ModelOutput, ScoringWeights};
use crate::motivation::domain::{
    NormalizedSignals, OwnerClassification, OwnerSubClass, SignalField,
};

const SLOW_PERMIT_ISSUE_DAYS: u32 = 30;

const EXPECTED_FIELDS: &[SignalField] = &[
    SignalField::OwnerName,
    SignalField::LastSaleDate,
    SignalField::EstimatedValue,
    SignalField::DaysOnMarket,
    SignalField::YoyPriceChange,
    SignalField::Permits,
    SignalField::TaxDelinquent,
    SignalField::Vacant,
    SignalField::CodeLiens,
];

/// Institutions sell on process pressure: carrying costs, liens and time on the books.
/// Tenure is not a factor here. Banks and lien holders feel time on the books; estates and
/// public owners dispose on court or agency schedules regardless of acquisition date.
pub(super) fn score(
    signals: &NormalizedSignals,
    classification: &OwnerClassification,
    weights: &ScoringWeights,
) -> ModelOutput {
    let w = &weights.institutional;
    let mut ledger = FactorLedger::default();
    let mut risks = Vec::new();

    let distress = &signals.distress;
    ledger.add_counted(
        "code_liens",
        distress.code_liens,
        w.code_lien_each,
        w.code_lien_cap,
        format!("{} code lien(s) accruing against the asset", distress.code_liens),
    );

    let on_the_books = matches!(
        classification.sub_class,
        OwnerSubClass::BankReo | OwnerSubClass::TaxLien
    );
    match signals.ownership.months_since_sale {
        _ if !on_the_books => ledger.neutral(
            "holding_period",
            format!(
                "Holding period does not drive {} disposals",
                classification.sub_class.label()
            ),
        ),
        Some(months) if months >= 12 => ledger.add(
            "holding_period",
            w.holding_long,
            format!("On the books {months} months"),
        ),
        Some(months) if months >= 6 => ledger.add(
            "holding_period",
            w.holding_mid,
            format!("On the books {months} months"),
        ),
        Some(months) if months >= 3 => ledger.add(
            "holding_period",
            w.holding_short,
            format!("On the books {months} months"),
        ),
        Some(months) => {
            ledger.neutral("holding_period", format!("Acquired {months} months ago"))
        }
        None => ledger.neutral("holding_period", "Acquisition date unavailable"),
    }

    ledger.add_counted(
        "stalled_permits",
        signals.permits.stalled,
        w.stalled_permit_each,
        w.stalled_permit_cap,
        format!("{} stalled permit(s)", signals.permits.stalled),
    );

    match signals.market.days_on_market {
        Some(days) if days > 120 => ledger.add(
            "listing_age",
            w.stale_listing,
            format!("Area listings stale at {days} days"),
        ),
        Some(days) if days > 60 => ledger.add(
            "listing_age",
            w.slow_listing,
            format!("Area listings slow at {days} days"),
        ),
        _ => {}
    }

    if distress.vacant {
        ledger.add("vacant", w.vacant, "Vacant asset carrying holding costs");
    }
    if distress.tax_delinquent {
        ledger.add("tax_delinquent", w.tax_delinquent, "Taxes delinquent on the asset");
    }
    if distress.pre_foreclosure {
        ledger.add("pre_foreclosure", w.pre_foreclosure, "Foreclosure proceedings pending");
    }
    if signals.market.yoy_price_change.is_some_and(|change| change < 0.0) {
        ledger.add("soft_market", w.soft_market, "Values eroding while the asset is held");
    }
    if let Some(days) = signals
        .permits
        .median_days_to_issue
        .filter(|days| *days > SLOW_PERMIT_ISSUE_DAYS)
    {
        risks.push(format!(
            "City permits take a median {days} days to issue; repairs before resale will be slow"
        ));
    }

    match classification.sub_class {
        OwnerSubClass::BankReo => {
            risks.push("REO offers go through asset-manager approval".to_string())
        }
        OwnerSubClass::GovernmentFederal
        | OwnerSubClass::GovernmentState
        | OwnerSubClass::GovernmentLocal => {
            risks.push("Government disposals may require public bidding".to_string())
        }
        OwnerSubClass::EstateProbate | OwnerSubClass::EstateExecutor => {
            risks.push("Estate sales may need court confirmation".to_string())
        }
        OwnerSubClass::TaxLien => {
            risks.push("Redemption period may delay clear title".to_string())
        }
        _ => {}
    }

    ModelOutput {
        ledger,
        risks,
        expected_fields: EXPECTED_FIELDS,
    }
}
