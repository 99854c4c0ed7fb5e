//! Owner classification from noisy owner-name text plus parcel facts.
//!
//! Pattern tables are checked tier by tier: institutional patterns beat generic entity
//! patterns, which beat the provider's owner-type hint, which beats the individual-owner
//! heuristics. Within a tier the first table entry that matches wins.

use super::domain::{normalize_line, OwnerClassification, OwnerSubClass, PropertyFacts};

const INSTITUTIONAL_CONFIDENCE: f32 = 0.90;
const ENTITY_CONFIDENCE: f32 = 0.85;
const OWNER_TYPE_HINT_CONFIDENCE: f32 = 0.70;
const EXPLICIT_OCCUPANCY_CONFIDENCE: f32 = 0.60;
const DERIVED_OCCUPANCY_CONFIDENCE: f32 = 0.45;
const UNINFORMATIVE_CONFIDENCE: f32 = 0.20;

/// Transfers at or below this amount are treated as non-arm's-length (gift or inheritance).
const NOMINAL_CONSIDERATION: u64 = 100;

struct NamePattern {
    phrase: &'static str,
    sub_class: OwnerSubClass,
}

const fn pattern(phrase: &'static str, sub_class: OwnerSubClass) -> NamePattern {
    NamePattern { phrase, sub_class }
}

const INSTITUTIONAL_PATTERNS: &[NamePattern] = &[
    pattern("FEDERAL NATIONAL MORTGAGE", OwnerSubClass::GovernmentFederal),
    pattern("FEDERAL HOME LOAN MORTGAGE", OwnerSubClass::GovernmentFederal),
    pattern("FANNIE MAE", OwnerSubClass::GovernmentFederal),
    pattern("FREDDIE MAC", OwnerSubClass::GovernmentFederal),
    pattern("SECRETARY OF HOUSING", OwnerSubClass::GovernmentFederal),
    pattern("HUD", OwnerSubClass::GovernmentFederal),
    pattern("VETERANS AFFAIRS", OwnerSubClass::GovernmentFederal),
    pattern("UNITED STATES", OwnerSubClass::GovernmentFederal),
    pattern("STATE OF", OwnerSubClass::GovernmentState),
    pattern("COMMONWEALTH OF", OwnerSubClass::GovernmentState),
    pattern("DEPARTMENT OF TRANSPORTATION", OwnerSubClass::GovernmentState),
    pattern("CITY OF", OwnerSubClass::GovernmentLocal),
    pattern("COUNTY OF", OwnerSubClass::GovernmentLocal),
    pattern("TOWN OF", OwnerSubClass::GovernmentLocal),
    pattern("VILLAGE OF", OwnerSubClass::GovernmentLocal),
    pattern("HOUSING AUTHORITY", OwnerSubClass::GovernmentLocal),
    pattern("LAND BANK", OwnerSubClass::GovernmentLocal),
    pattern("SCHOOL DISTRICT", OwnerSubClass::GovernmentLocal),
    pattern("REDEVELOPMENT AUTHORITY", OwnerSubClass::GovernmentLocal),
    pattern("REDEVELOPMENT AGENCY", OwnerSubClass::GovernmentLocal),
    pattern("REDEVELOPMENT COMMISSION", OwnerSubClass::GovernmentLocal),
    pattern("TAX LIEN", OwnerSubClass::TaxLien),
    pattern("TAX CERTIFICATE", OwnerSubClass::TaxLien),
    pattern("TAX SALE", OwnerSubClass::TaxLien),
    pattern("EXECUTOR", OwnerSubClass::EstateExecutor),
    pattern("EXECUTRIX", OwnerSubClass::EstateExecutor),
    pattern("ADMINISTRATOR", OwnerSubClass::EstateExecutor),
    pattern("PERSONAL REPRESENTATIVE", OwnerSubClass::EstateExecutor),
    pattern("ESTATE OF", OwnerSubClass::EstateProbate),
    pattern("HEIRS", OwnerSubClass::EstateProbate),
    pattern("DECEASED", OwnerSubClass::EstateProbate),
    pattern("DECD", OwnerSubClass::EstateProbate),
    pattern("BANK", OwnerSubClass::BankReo),
    pattern("NATIONAL ASSOCIATION", OwnerSubClass::BankReo),
    pattern("SAVINGS", OwnerSubClass::BankReo),
    pattern("CREDIT UNION", OwnerSubClass::BankReo),
    pattern("MORTGAGE", OwnerSubClass::BankReo),
    pattern("LOAN SERVICING", OwnerSubClass::BankReo),
    pattern("REO", OwnerSubClass::BankReo),
];

const TRUST_PATTERNS: &[NamePattern] = &[
    pattern("IRREVOCABLE", OwnerSubClass::TrustIrrevocable),
    pattern("IRREV", OwnerSubClass::TrustIrrevocable),
    pattern("LIVING TRUST", OwnerSubClass::TrustLiving),
    pattern("REVOCABLE", OwnerSubClass::TrustLiving),
    pattern("FAMILY TRUST", OwnerSubClass::TrustLiving),
    pattern("TRUST", OwnerSubClass::TrustLiving),
    pattern("TRUSTEE", OwnerSubClass::TrustLiving),
    pattern("TTEE", OwnerSubClass::TrustLiving),
    pattern("TR", OwnerSubClass::TrustLiving),
];

const LLC_PATTERNS: &[&str] = &["LLC", "L L C", "LTD LIABILITY", "LIMITED LIABILITY"];

const CORPORATE_PATTERNS: &[&str] = &[
    "INC",
    "INCORPORATED",
    "CORP",
    "CORPORATION",
    "COMPANY",
    "LP",
    "LLP",
    "LTD",
    "HOLDINGS",
    "PROPERTIES",
    "INVESTMENTS",
    "REALTY",
    "PARTNERS",
    "CAPITAL",
    "VENTURES",
    "ENTERPRISES",
    "GROUP",
];

/// Classify an owner from name text and parcel facts. Never fails.
pub fn classify(owner_name: &str, facts: &PropertyFacts) -> OwnerClassification {
    let name = normalize_line(owner_name);

    if !name.is_empty() {
        if let Some(found) = match_entity_name(&name, facts) {
            return found;
        }
    }

    if let Some(hint) = facts.owner_type.as_deref().and_then(|raw| owner_type_hint(raw, facts)) {
        return hint;
    }

    classify_individual(facts)
}

fn match_entity_name(name: &str, facts: &PropertyFacts) -> Option<OwnerClassification> {
    if let Some(found) = INSTITUTIONAL_PATTERNS
        .iter()
        .find(|candidate| contains_phrase(name, candidate.phrase))
    {
        return Some(OwnerClassification::new(
            found.sub_class,
            INSTITUTIONAL_CONFIDENCE,
            Some(found.phrase.to_string()),
        ));
    }

    if let Some(found) = TRUST_PATTERNS
        .iter()
        .find(|candidate| contains_phrase(name, candidate.phrase))
    {
        return Some(OwnerClassification::new(
            found.sub_class,
            ENTITY_CONFIDENCE,
            Some(found.phrase.to_string()),
        ));
    }

    if let Some(phrase) = LLC_PATTERNS
        .iter()
        .find(|phrase| contains_phrase(name, phrase))
    {
        return Some(OwnerClassification::new(
            llc_sub_class(facts),
            ENTITY_CONFIDENCE,
            Some((*phrase).to_string()),
        ));
    }

    CORPORATE_PATTERNS
        .iter()
        .find(|phrase| contains_phrase(name, phrase))
        .map(|phrase| {
            OwnerClassification::new(
                OwnerSubClass::Corporate,
                ENTITY_CONFIDENCE,
                Some((*phrase).to_string()),
            )
        })
}

fn llc_sub_class(facts: &PropertyFacts) -> OwnerSubClass {
    if facts.properties_owned.unwrap_or(1) >= 2 {
        OwnerSubClass::LlcMulti
    } else {
        OwnerSubClass::LlcSingle
    }
}

fn owner_type_hint(raw: &str, facts: &PropertyFacts) -> Option<OwnerClassification> {
    let hint = raw.trim().to_ascii_lowercase();
    let sub_class = if hint.contains("government") || hint.contains("municipal") {
        OwnerSubClass::GovernmentLocal
    } else if hint.contains("bank") || hint.contains("reo") || hint.contains("lender") {
        OwnerSubClass::BankReo
    } else if hint.starts_with("estate") || hint.contains("probate") {
        OwnerSubClass::EstateProbate
    } else if hint.contains("trust") {
        OwnerSubClass::TrustLiving
    } else if hint.contains("llc") {
        llc_sub_class(facts)
    } else if hint.contains("corporate") || hint.contains("company") || hint.contains("business")
    {
        OwnerSubClass::Corporate
    } else {
        return None;
    };

    Some(OwnerClassification::new(
        sub_class,
        OWNER_TYPE_HINT_CONFIDENCE,
        Some(format!("owner_type:{hint}")),
    ))
}

fn classify_individual(facts: &PropertyFacts) -> OwnerClassification {
    let holdings = facts.properties_owned.unwrap_or(0);
    let mailing_differs = match (&facts.mailing_address, &facts.property_address) {
        (Some(mailing), Some(site)) => Some(!mailing.same_location(site)),
        _ => None,
    };
    let out_of_state = match (&facts.mailing_address, &facts.property_address) {
        (Some(mailing), Some(site)) => mailing.same_state(site).map(|same| !same),
        _ => None,
    };
    let absentee = match facts.owner_occupied {
        Some(occupied) => Some(!occupied),
        None => mailing_differs,
    };
    let confidence = if facts.owner_occupied.is_some() {
        EXPLICIT_OCCUPANCY_CONFIDENCE
    } else {
        DERIVED_OCCUPANCY_CONFIDENCE
    };

    if holdings >= 5 {
        return OwnerClassification::new(
            OwnerSubClass::PortfolioInvestor,
            EXPLICIT_OCCUPANCY_CONFIDENCE,
            Some(format!("holdings:{holdings}")),
        );
    }
    if holdings >= 2 && absentee == Some(true) {
        return OwnerClassification::new(
            OwnerSubClass::SmallInvestor,
            confidence,
            Some(format!("holdings:{holdings}")),
        );
    }
    if facts
        .last_sale_price
        .is_some_and(|price| price <= NOMINAL_CONSIDERATION)
    {
        return OwnerClassification::new(
            OwnerSubClass::Inherited,
            DERIVED_OCCUPANCY_CONFIDENCE,
            Some("nominal_transfer".to_string()),
        );
    }

    match (absentee, out_of_state) {
        (Some(true), Some(true)) => OwnerClassification::new(
            OwnerSubClass::OutOfState,
            confidence,
            Some("mailing_state".to_string()),
        ),
        (Some(true), _) => OwnerClassification::new(
            OwnerSubClass::Absentee,
            confidence,
            Some("mailing_address".to_string()),
        ),
        (Some(false), _) => OwnerClassification::new(
            OwnerSubClass::OwnerOccupied,
            confidence,
            Some("occupancy".to_string()),
        ),
        (None, _) => {
            OwnerClassification::new(OwnerSubClass::OwnerOccupied, UNINFORMATIVE_CONFIDENCE, None)
        }
    }
}

/// Whole-token phrase match on an already normalised name.
fn contains_phrase(name: &str, phrase: &str) -> bool {
    let padded = format!(" {name} ");
    padded.contains(&format!(" {phrase} "))
}
