use std::sync::atomic::Ordering;

use super::common::*;
use crate::motivation::domain::PropertyId;
use crate::motivation::signals::{
    DistressIndicators, FetchOptions, IdentityError, ProviderError, SignalSource, Valuation,
};

fn by_id(id: &str) -> FetchOptions {
    FetchOptions {
        property_id: Some(PropertyId(id.to_string())),
        ..FetchOptions::default()
    }
}

#[tokio::test]
async fn permit_failure_is_isolated_to_one_error_entry() {
    let harness = Harness::seeded();
    harness
        .permits
        .fail_with(ProviderError::Unavailable("permit api down".to_string()));
    let fetcher = harness.fetcher();

    let result = fetcher
        .fetch_property_signals(&by_id("prop-abc"))
        .await
        .expect("partial results are results");

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].source, SignalSource::Permits);
    assert!(result.sources.property_data);
    assert!(result.sources.distress_store);
    assert!(!result.sources.permits);
    assert_eq!(result.signals.owner_name.as_deref(), Some("ABC Holdings LLC"));
    assert_eq!(result.signals.yoy_price_change, Some(-3.5));
    assert!(result.signals.permits.is_none());
}

#[tokio::test]
async fn cached_signals_are_served_without_provider_calls_until_expiry() {
    let harness = Harness::seeded();
    let fetcher = harness.fetcher();

    let first = fetcher
        .fetch_property_signals(&by_id("prop-smith"))
        .await
        .expect("fetch");
    assert!(!first.from_cache);
    assert!(first.sources.all());
    let calls_after_first = harness.provider_calls();
    assert!(calls_after_first > 0);

    harness.clock.advance(chrono::Duration::minutes(30));
    let second = fetcher
        .fetch_property_signals(&by_id("prop-smith"))
        .await
        .expect("fetch");
    assert!(second.from_cache);
    assert_eq!(second.signals, first.signals);
    assert_eq!(harness.provider_calls(), calls_after_first);

    harness.clock.advance(chrono::Duration::minutes(31));
    let third = fetcher
        .fetch_property_signals(&by_id("prop-smith"))
        .await
        .expect("fetch");
    assert!(!third.from_cache);
    assert!(harness.provider_calls() > calls_after_first);
}

#[tokio::test]
async fn partial_fetches_expire_on_the_shorter_ttl() {
    let harness = Harness::seeded();
    harness
        .permits
        .fail_with(ProviderError::InvalidResponse("html error page".to_string()));
    let fetcher = harness.fetcher();

    fetcher
        .fetch_property_signals(&by_id("prop-abc"))
        .await
        .expect("fetch");
    let calls = harness.provider_calls();

    harness.clock.advance(chrono::Duration::minutes(4));
    let cached = fetcher
        .fetch_property_signals(&by_id("prop-abc"))
        .await
        .expect("fetch");
    assert!(cached.from_cache);
    assert_eq!(harness.provider_calls(), calls);

    harness.clock.advance(chrono::Duration::minutes(2));
    let refreshed = fetcher
        .fetch_property_signals(&by_id("prop-abc"))
        .await
        .expect("fetch");
    assert!(!refreshed.from_cache);
}

#[tokio::test]
async fn force_refresh_bypasses_the_cache() {
    let harness = Harness::seeded();
    let fetcher = harness.fetcher();
    fetcher
        .fetch_property_signals(&by_id("prop-smith"))
        .await
        .expect("fetch");
    let calls = harness.provider_calls();

    let refreshed = fetcher
        .fetch_property_signals(&FetchOptions {
            force_refresh: true,
            ..by_id("prop-smith")
        })
        .await
        .expect("fetch");
    assert!(!refreshed.from_cache);
    assert!(harness.provider_calls() > calls);
}

#[tokio::test]
async fn unknown_property_id_fails_before_any_provider_call() {
    let harness = Harness::seeded();
    let fetcher = harness.fetcher();

    let error = fetcher
        .fetch_property_signals(&by_id("prop-missing"))
        .await
        .expect_err("unresolvable");
    assert_eq!(
        error,
        IdentityError::Unresolvable(PropertyId("prop-missing".to_string()))
    );
    assert_eq!(harness.provider_calls(), 0);
    assert_eq!(harness.cache.len().await, 0);
}

#[tokio::test]
async fn missing_identity_is_rejected() {
    let harness = Harness::seeded();
    let error = harness
        .fetcher()
        .fetch_property_signals(&FetchOptions::default())
        .await
        .expect_err("no identity");
    assert_eq!(error, IdentityError::Missing);
}

#[tokio::test]
async fn unreachable_store_degrades_to_id_only_distress_lookup() {
    let harness = Harness::seeded();
    harness
        .store
        .fail_resolution(ProviderError::Unavailable("db offline".to_string()));
    harness.store.insert_distress(
        "prop-smith",
        DistressIndicators {
            tax_delinquent: Some(true),
            ..DistressIndicators::default()
        },
    );

    let result = harness
        .fetcher()
        .fetch_property_signals(&by_id("prop-smith"))
        .await
        .expect("degraded result");

    assert_eq!(result.signals.tax_delinquent, Some(true));
    assert!(result.sources.distress_store);
    assert_eq!(result.errors.len(), 2);
    assert!(result
        .errors
        .iter()
        .all(|error| error.error.starts_with("skipped")));
    assert_eq!(harness.property_data.calls.load(Ordering::SeqCst), 0);
    assert_eq!(harness.permits.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dedicated_valuation_supersedes_the_record_estimate() {
    let harness = Harness::seeded();
    harness.property_data.insert_valuation(
        &oak_street(),
        Valuation {
            value: 335_000,
            confidence: Some(0.9),
        },
    );

    let result = harness
        .fetcher()
        .fetch_property_signals(&FetchOptions {
            address: Some(oak_street()),
            ..FetchOptions::default()
        })
        .await
        .expect("fetch");
    assert_eq!(result.signals.estimated_value, Some(335_000));
    assert_eq!(result.signals.property_address, Some(oak_street()));
}

#[tokio::test]
async fn transient_errors_are_retried_once() {
    let harness = Harness::seeded();
    harness
        .permits
        .fail_with(ProviderError::Timeout { after_ms: 10 });
    harness
        .fetcher()
        .fetch_property_signals(&by_id("prop-smith"))
        .await
        .expect("fetch");
    assert_eq!(harness.permits.calls.load(Ordering::SeqCst), 2);

    let harness = Harness::seeded();
    harness.permits.fail_with(ProviderError::NotFound);
    harness
        .fetcher()
        .fetch_property_signals(&by_id("prop-smith"))
        .await
        .expect("fetch");
    assert_eq!(harness.permits.calls.load(Ordering::SeqCst), 1);
}
