//! Property-based tests for the pure helpers behind categories, the stock
//! ledger and request filtering.

use chrono::NaiveDate;
use lenta_gestionale::{
    entities::{warehouse_movement::MovementType, warehouse_request::RequestStatus},
    services::{
        notifications::missing_report_message,
        warehouse::{
            categories::{slugify, FALLBACK_SLUG},
            requests::parse_status_filter,
        },
    },
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000, 0u32..4).prop_map(|(units, scale)| Decimal::new(units, scale))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn slug_is_alphanumeric_with_single_dashes(name in "\\PC{0,40}") {
        let slug = slugify(&name);
        prop_assert!(!slug.is_empty());
        prop_assert!(slug.chars().all(|c| c.is_alphanumeric() || c == '-'));
        prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
        prop_assert!(!slug.contains("--"));
    }

    #[test]
    fn ascii_names_give_lowercase_ascii_slugs(name in "[ -~]{0,40}") {
        let slug = slugify(&name);
        prop_assert!(slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    #[test]
    fn accented_letters_survive(word in "[a-zàèéìòùç]{1,12}") {
        prop_assert_eq!(slugify(&word.to_uppercase()), word.clone());
        prop_assert_eq!(slugify(&format!("  {word}!  ")), word);
    }

    #[test]
    fn slugify_is_idempotent(name in "[A-Za-z0-9 &/_.-]{0,30}") {
        let once = slugify(&name);
        prop_assert_eq!(slugify(&once), once);
    }

    #[test]
    fn names_without_ascii_alphanumerics_fall_back(name in "[ _&!?.-]{0,20}") {
        prop_assert_eq!(slugify(&name), FALLBACK_SLUG);
    }

    #[test]
    fn movement_sign_follows_type(quantity in quantity_strategy()) {
        prop_assert!(MovementType::Inbound.signed(quantity) >= Decimal::ZERO);
        prop_assert!(MovementType::Outbound.signed(quantity) <= Decimal::ZERO);
        prop_assert_eq!(MovementType::Adjustment.signed(quantity), quantity);
        prop_assert_eq!(
            MovementType::Inbound.signed(quantity).abs(),
            MovementType::Outbound.signed(quantity).abs()
        );
    }

    #[test]
    fn unknown_status_filters_fall_back_to_pending(value in "[a-z]{1,12}") {
        let parsed = parse_status_filter(Some(&value));
        match value.as_str() {
            "tutte" => prop_assert_eq!(parsed, None),
            "approvata" => prop_assert_eq!(parsed, Some(RequestStatus::Approvata)),
            "evasa" => prop_assert_eq!(parsed, Some(RequestStatus::Evasa)),
            "rifiutata" => prop_assert_eq!(parsed, Some(RequestStatus::Rifiutata)),
            _ => prop_assert_eq!(parsed, Some(RequestStatus::InAttesa)),
        }
    }

    #[test]
    fn reminder_names_the_site_in_both_languages(
        site in "[A-Za-z ]{1,30}",
        language in prop_oneof!["it", "fr", "xx"],
        day in 1u32..28,
    ) {
        let today = NaiveDate::from_ymd_opt(2026, 3, day).expect("valid date");
        let message = missing_report_message(&language, &site, today);
        prop_assert!(message.contains(&site));
        prop_assert!(message.contains("2026-03-"));
        if language == "fr" {
            prop_assert!(message.starts_with("Pense"));
        } else {
            prop_assert!(message.starts_with("Ricorda"));
        }
    }
}

#[test]
fn status_filter_defaults_to_pending() {
    assert_eq!(parse_status_filter(None), Some(RequestStatus::InAttesa));
    assert_eq!(parse_status_filter(Some("   ")), Some(RequestStatus::InAttesa));
    assert_eq!(parse_status_filter(Some("TUTTE")), None);
}
