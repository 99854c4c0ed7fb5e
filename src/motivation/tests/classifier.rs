use super::common::*;
use crate::motivation::classifier::classify;
use crate::motivation::domain::{OwnerSubClass, PrimaryOwnerClass, PropertyFacts};

fn facts() -> PropertyFacts {
    PropertyFacts::default()
}

#[test]
fn family_trust_is_a_living_trust() {
    let result = classify("Smith Family Trust", &facts());
    assert_eq!(result.primary_class, PrimaryOwnerClass::Individual);
    assert_eq!(result.sub_class, OwnerSubClass::TrustLiving);
    assert_eq!(result.matched_pattern.as_deref(), Some("FAMILY TRUST"));
}

#[test]
fn irrevocable_trust_is_treated_as_an_entity() {
    let result = classify("Jones Irrevocable Trust dtd 3/4/2011", &facts());
    assert_eq!(result.primary_class, PrimaryOwnerClass::InvestorEntity);
    assert_eq!(result.sub_class, OwnerSubClass::TrustIrrevocable);
}

#[test]
fn llc_splits_on_holdings() {
    let single = classify("Maple Rentals, L.L.C.", &facts());
    assert_eq!(single.sub_class, OwnerSubClass::LlcSingle);

    let multi = classify(
        "ABC Holdings LLC",
        &PropertyFacts {
            properties_owned: Some(3),
            ..facts()
        },
    );
    assert_eq!(multi.sub_class, OwnerSubClass::LlcMulti);
    assert!(multi.confidence > 0.8);
}

#[test]
fn institutional_patterns_beat_entity_suffixes() {
    let bank = classify("First National Bank Trust Co", &facts());
    assert_eq!(bank.primary_class, PrimaryOwnerClass::InstitutionalDistressed);
    assert_eq!(bank.sub_class, OwnerSubClass::BankReo);

    let city = classify("City of Des Moines", &facts());
    assert_eq!(city.sub_class, OwnerSubClass::GovernmentLocal);

    let federal = classify("Secretary of Housing and Urban Development", &facts());
    assert_eq!(federal.sub_class, OwnerSubClass::GovernmentFederal);

    let estate = classify("Estate of Mary Miller", &facts());
    assert_eq!(estate.sub_class, OwnerSubClass::EstateProbate);

    let executor = classify("John Miller, Executor", &facts());
    assert_eq!(executor.sub_class, OwnerSubClass::EstateExecutor);
}

#[test]
fn redevelopment_needs_a_public_body_to_be_government() {
    let developer = classify("Acme Redevelopment LLC", &facts());
    assert_eq!(developer.primary_class, PrimaryOwnerClass::InvestorEntity);
    assert_ne!(developer.sub_class, OwnerSubClass::GovernmentLocal);

    let authority = classify("Des Moines Redevelopment Authority", &facts());
    assert_eq!(authority.sub_class, OwnerSubClass::GovernmentLocal);
}

#[test]
fn real_estate_in_a_company_name_is_not_probate() {
    let result = classify("Midwest Real Estate Partners LLC", &facts());
    assert_eq!(result.sub_class, OwnerSubClass::LlcSingle);
}

#[test]
fn tokens_must_match_whole_words() {
    let result = classify("Trevor Reorden", &facts());
    assert_eq!(result.primary_class, PrimaryOwnerClass::Individual);
    assert_ne!(result.sub_class, OwnerSubClass::BankReo);
}

#[test]
fn owner_type_hint_is_used_when_the_name_is_silent() {
    let result = classify(
        "Pat Doe",
        &PropertyFacts {
            owner_type: Some("Estate".to_string()),
            ..facts()
        },
    );
    assert_eq!(result.sub_class, OwnerSubClass::EstateProbate);
    assert!((result.confidence - 0.70).abs() < f32::EPSILON);
}

#[test]
fn individuals_fall_back_to_address_heuristics() {
    let out_of_state = classify(
        "Pat Doe",
        &PropertyFacts {
            property_address: Some(oak_street()),
            mailing_address: Some(out_of_state_mailing()),
            ..facts()
        },
    );
    assert_eq!(out_of_state.sub_class, OwnerSubClass::OutOfState);

    let occupied = classify(
        "Pat Doe",
        &PropertyFacts {
            property_address: Some(oak_street()),
            mailing_address: Some(oak_street()),
            owner_occupied: Some(true),
            ..facts()
        },
    );
    assert_eq!(occupied.sub_class, OwnerSubClass::OwnerOccupied);
    assert!(occupied.confidence > out_of_state.confidence - f32::EPSILON);
}

#[test]
fn multiple_holdings_mark_an_individual_as_investor() {
    let portfolio = classify(
        "Pat Doe",
        &PropertyFacts {
            properties_owned: Some(7),
            ..facts()
        },
    );
    assert_eq!(portfolio.sub_class, OwnerSubClass::PortfolioInvestor);
    assert_eq!(portfolio.primary_class, PrimaryOwnerClass::InvestorEntity);

    let small = classify(
        "Pat Doe",
        &PropertyFacts {
            properties_owned: Some(2),
            owner_occupied: Some(false),
            ..facts()
        },
    );
    assert_eq!(small.sub_class, OwnerSubClass::SmallInvestor);
}

#[test]
fn nominal_transfers_read_as_inherited() {
    let result = classify(
        "Pat Doe",
        &PropertyFacts {
            last_sale_price: Some(10),
            ..facts()
        },
    );
    assert_eq!(result.sub_class, OwnerSubClass::Inherited);
}

#[test]
fn uninformative_input_defaults_to_low_confidence_individual() {
    let result = classify("   ", &facts());
    assert_eq!(result.primary_class, PrimaryOwnerClass::Individual);
    assert_eq!(result.sub_class, OwnerSubClass::OwnerOccupied);
    assert!((result.confidence - 0.20).abs() < f32::EPSILON);
    assert!(result.matched_pattern.is_none());
}
