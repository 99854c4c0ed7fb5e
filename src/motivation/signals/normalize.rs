//! Rescale raw provider signals into the units the scoring models consume.
//!
//! Defaults applied here, and only here:
//! - distress flags that were not reported are `false`, missing code-lien counts are `0`;
//! - occupancy falls back to comparing mailing and property addresses when not reported;
//! - a sale dated after `as_of` counts as zero months of ownership;
//! - permits without a filing date count toward totals but not recency buckets.

use chrono::{Datelike, NaiveDate};

use crate::motivation::domain::{
    DistressFlags, MarketConditions, MarketMomentum, NormalizedSignals, OwnershipProfile,
    PermitActivity, RawPropertySignals, ValuationProfile,
};

const RECENT_PERMIT_MONTHS: u32 = 12;
const STALLED_PERMIT_DAYS: i64 = 180;
const MOMENTUM_BAND_PCT: f64 = 2.0;
const NOMINAL_CONSIDERATION: u64 = 100;

pub fn normalize(raw: &RawPropertySignals, as_of: NaiveDate) -> NormalizedSignals {
    NormalizedSignals {
        as_of,
        ownership: ownership_profile(raw, as_of),
        valuation: valuation_profile(raw),
        market: market_conditions(raw),
        permits: permit_activity(raw, as_of),
        distress: DistressFlags {
            pre_foreclosure: raw.pre_foreclosure.unwrap_or(false),
            tax_delinquent: raw.tax_delinquent.unwrap_or(false),
            vacant: raw.vacant.unwrap_or(false),
            code_liens: raw.code_liens.unwrap_or(0),
        },
        present: raw.present_fields(),
    }
}

fn ownership_profile(raw: &RawPropertySignals, as_of: NaiveDate) -> OwnershipProfile {
    let mailing_differs = match (&raw.mailing_address, &raw.property_address) {
        (Some(mailing), Some(site)) => Some(!mailing.same_location(site)),
        _ => None,
    };
    let absentee = raw.owner_occupied.map(|occupied| !occupied).or(mailing_differs);
    let out_of_state = match (&raw.mailing_address, &raw.property_address) {
        (Some(mailing), Some(site)) => mailing.same_state(site).map(|same| !same),
        _ => None,
    };

    OwnershipProfile {
        months_since_sale: raw.last_sale_date.map(|sold| months_between(sold, as_of)),
        owner_occupied: raw.owner_occupied.or(mailing_differs.map(|differs| !differs)),
        absentee,
        out_of_state: out_of_state.map(|out| out && absentee.unwrap_or(true)),
        properties_owned: raw.properties_owned,
        nominal_transfer: raw
            .last_sale_price
            .is_some_and(|price| price <= NOMINAL_CONSIDERATION),
    }
}

fn valuation_profile(raw: &RawPropertySignals) -> ValuationProfile {
    let equity_ratio = match (raw.estimated_value, raw.last_sale_price) {
        (Some(value), Some(basis)) if value > 0 => {
            Some((value as f64 - basis as f64) / value as f64)
        }
        _ => None,
    };

    ValuationProfile {
        estimated_value: raw.estimated_value,
        last_sale_price: raw.last_sale_price,
        equity_ratio,
        confidence: raw.valuation_confidence,
    }
}

fn market_conditions(raw: &RawPropertySignals) -> MarketConditions {
    let momentum = raw.yoy_price_change.map(|change| {
        if change < -MOMENTUM_BAND_PCT {
            MarketMomentum::Declining
        } else if change > MOMENTUM_BAND_PCT {
            MarketMomentum::Rising
        } else {
            MarketMomentum::Flat
        }
    });

    MarketConditions {
        days_on_market: raw.days_on_market,
        sale_to_list_ratio: raw.sale_to_list_ratio,
        inventory: raw.inventory,
        median_price: raw.median_price,
        yoy_price_change: raw.yoy_price_change,
        momentum,
    }
}

fn permit_activity(raw: &RawPropertySignals, as_of: NaiveDate) -> PermitActivity {
    let Some(permits) = raw.permits.as_ref() else {
        return PermitActivity {
            median_days_to_issue: raw.permit_issue_days,
            ..PermitActivity::default()
        };
    };

    let mut activity = PermitActivity {
        known: true,
        total: permits.len() as u32,
        median_days_to_issue: raw.permit_issue_days,
        ..PermitActivity::default()
    };

    for permit in permits {
        let Some(filed_on) = permit.filed_on else {
            continue;
        };
        let months = months_between(filed_on, as_of);
        if months <= RECENT_PERMIT_MONTHS {
            activity.recent += 1;
        }
        if permit.status.is_open() && (as_of - filed_on).num_days() > STALLED_PERMIT_DAYS {
            activity.stalled += 1;
        }
        activity.months_since_latest = Some(
            activity
                .months_since_latest
                .map_or(months, |latest| latest.min(months)),
        );
    }

    activity
}

/// Whole calendar months from `from` to `to`, never negative.
pub(crate) fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if from >= to {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as u32
}
