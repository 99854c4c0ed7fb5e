use std::collections::HashMap;

use super::providers::{DistressIndicators, MarketSnapshot, PermitHistory, PropertyRecord, Valuation};
use crate::motivation::domain::{PostalAddress, RawPropertySignals, SignalField};

/// How much a source is trusted for a given field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Authority {
    Derived,
    Generic,
    Dedicated,
}

/// Accumulates provider payloads. A filled field is only replaced by a strictly more
/// authoritative value, so merge order between equally trusted sources does not matter.
#[derive(Debug, Default)]
pub(crate) struct SignalMerger {
    signals: RawPropertySignals,
    authority: HashMap<SignalField, Authority>,
}

impl SignalMerger {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn property_address(&mut self, address: PostalAddress, level: Authority) {
        merge_field(
            &mut self.authority,
            SignalField::PropertyAddress,
            &mut self.signals.property_address,
            Some(address),
            level,
        );
    }

    pub(crate) fn record(&mut self, record: PropertyRecord) {
        let level = Authority::Generic;
        let PropertyRecord {
            owner_name,
            owner_type,
            mailing_address,
            owner_occupied,
            properties_owned,
            last_sale_date,
            last_sale_price,
            estimated_value,
            assessed_value,
            vacant,
        } = record;
        let owner_name = owner_name.filter(|name| !name.trim().is_empty());

        let authority = &mut self.authority;
        let signals = &mut self.signals;
        merge_field(authority, SignalField::OwnerName, &mut signals.owner_name, owner_name, level);
        merge_field(authority, SignalField::OwnerType, &mut signals.owner_type, owner_type, level);
        merge_field(
            authority,
            SignalField::MailingAddress,
            &mut signals.mailing_address,
            mailing_address,
            level,
        );
        merge_field(
            authority,
            SignalField::OwnerOccupied,
            &mut signals.owner_occupied,
            owner_occupied,
            level,
        );
        merge_field(
            authority,
            SignalField::PropertiesOwned,
            &mut signals.properties_owned,
            properties_owned,
            level,
        );
        merge_field(
            authority,
            SignalField::LastSaleDate,
            &mut signals.last_sale_date,
            last_sale_date,
            level,
        );
        merge_field(
            authority,
            SignalField::LastSalePrice,
            &mut signals.last_sale_price,
            last_sale_price,
            level,
        );
        merge_field(
            authority,
            SignalField::EstimatedValue,
            &mut signals.estimated_value,
            estimated_value,
            level,
        );
        merge_field(
            authority,
            SignalField::AssessedValue,
            &mut signals.assessed_value,
            assessed_value,
            level,
        );
        merge_field(authority, SignalField::Vacant, &mut signals.vacant, vacant, level);
    }

    pub(crate) fn market(&mut self, snapshot: MarketSnapshot) {
        let level = Authority::Generic;
        let authority = &mut self.authority;
        let signals = &mut self.signals;
        merge_field(
            authority,
            SignalField::DaysOnMarket,
            &mut signals.days_on_market,
            snapshot.days_on_market,
            level,
        );
        merge_field(
            authority,
            SignalField::SaleToListRatio,
            &mut signals.sale_to_list_ratio,
            snapshot.sale_to_list_ratio,
            level,
        );
        merge_field(
            authority,
            SignalField::Inventory,
            &mut signals.inventory,
            snapshot.inventory,
            level,
        );
        merge_field(
            authority,
            SignalField::MedianPrice,
            &mut signals.median_price,
            snapshot.median_price,
            level,
        );
        merge_field(
            authority,
            SignalField::YoyPriceChange,
            &mut signals.yoy_price_change,
            snapshot.yoy_price_change,
            level,
        );
    }

    pub(crate) fn valuation(&mut self, valuation: Valuation) {
        merge_field(
            &mut self.authority,
            SignalField::EstimatedValue,
            &mut self.signals.estimated_value,
            Some(valuation.value),
            Authority::Dedicated,
        );
        self.signals.valuation_confidence = valuation.confidence;
    }

    pub(crate) fn permits(&mut self, history: PermitHistory) {
        merge_field(
            &mut self.authority,
            SignalField::Permits,
            &mut self.signals.permits,
            Some(history.permits),
            Authority::Dedicated,
        );
        if let Some(days) = history
            .city_metrics
            .and_then(|metrics| metrics.median_days_to_issue)
        {
            self.signals.permit_issue_days = Some(days);
        }
    }

    pub(crate) fn distress(&mut self, indicators: DistressIndicators) {
        let level = Authority::Dedicated;
        let authority = &mut self.authority;
        let signals = &mut self.signals;
        merge_field(
            authority,
            SignalField::PreForeclosure,
            &mut signals.pre_foreclosure,
            indicators.pre_foreclosure,
            level,
        );
        merge_field(
            authority,
            SignalField::TaxDelinquent,
            &mut signals.tax_delinquent,
            indicators.tax_delinquent,
            level,
        );
        merge_field(authority, SignalField::Vacant, &mut signals.vacant, indicators.vacant, level);
        merge_field(
            authority,
            SignalField::CodeLiens,
            &mut signals.code_liens,
            indicators.code_liens,
            level,
        );
    }

    pub(crate) fn finish(self) -> RawPropertySignals {
        self.signals
    }
}

fn merge_field<T>(
    authority: &mut HashMap<SignalField, Authority>,
    field: SignalField,
    slot: &mut Option<T>,
    incoming: Option<T>,
    level: Authority,
) {
    let Some(value) = incoming else {
        return;
    };

    let replace = match (slot.is_some(), authority.get(&field)) {
        (false, _) => true,
        (true, Some(existing)) => level > *existing,
        (true, None) => true,
    };

    if replace {
        *slot = Some(value);
        authority.insert(field, level);
    }
}
