/// Property-based tests using proptest
/// Tests invariants that should hold for all inputs
use proptest::prelude::*;

use call_notify_api::call_models::{CallRecord, CallWebhookPayload};
use call_notify_api::contacts::{digits, numbers_match};
use call_notify_api::report::{format_cost, format_duration_ms, render};
use std::collections::BTreeMap;

// Property: payload parsing should never panic, only return Err
proptest! {
    #[test]
    fn payload_parsing_never_panics(body in "\\PC*") {
        let _ = serde_json::from_str::<CallWebhookPayload>(&body);
    }

    #[test]
    fn digit_extraction_preserves_order(number in "[0-9]{10}") {
        let formatted = format!("({}) {}-{}", &number[..3], &number[3..6], &number[6..]);
        prop_assert_eq!(digits(&formatted), number);
    }
}

// Property: phone matching is punctuation- and country-prefix-insensitive
proptest! {
    #[test]
    fn formatting_never_affects_matching(
        number in "[0-9]{10}",
        use_parens in proptest::bool::ANY,
        use_dash in proptest::bool::ANY,
        use_plus_one in proptest::bool::ANY
    ) {
        let mut formatted = if use_parens {
            format!("({}) {}-{}", &number[..3], &number[3..6], &number[6..])
        } else if use_dash {
            format!("{}-{}-{}", &number[..3], &number[3..6], &number[6..])
        } else {
            number.clone()
        };
        if use_plus_one {
            formatted = format!("+1 {}", formatted);
        }

        prop_assert!(numbers_match(&formatted, &number));
        prop_assert!(numbers_match(&number, &formatted));
    }

    #[test]
    fn matching_never_panics(a in "\\PC*", b in "\\PC*") {
        let _ = numbers_match(&a, &b);
    }
}

// Property: duration formatting is exact minute/second decomposition
proptest! {
    #[test]
    fn duration_format_decomposes_exactly(ms in 0u64..=86_400_000u64) {
        let formatted = format_duration_ms(ms);
        let (minutes_part, rest) = formatted.split_once("m ").unwrap();
        let seconds_part = rest.strip_suffix('s').unwrap();
        let minutes: u64 = minutes_part.parse().unwrap();
        let seconds: u64 = seconds_part.parse().unwrap();

        prop_assert!(seconds < 60);
        prop_assert_eq!(minutes, ms / 60000);
        prop_assert_eq!(minutes * 60 + seconds, ms / 1000);
    }

    #[test]
    fn cost_format_has_two_decimals(value in 0.0f64..=100_000.0f64) {
        let formatted = format_cost(value);
        prop_assert!(formatted.starts_with('$'));
        let (_, decimals) = formatted[1..].split_once('.').unwrap();
        prop_assert_eq!(decimals.len(), 2);
    }
}

// Property: rendering is deterministic for any field content
proptest! {
    #[test]
    fn rendering_is_deterministic(
        id in "[a-zA-Z0-9_]{1,16}",
        status in "[a-z-]{1,12}",
        transcript in proptest::option::of("\\PC{0,200}"),
        duration in proptest::option::of(0u64..=10_000_000u64)
    ) {
        let record = CallRecord {
            id,
            status,
            from: None,
            to: None,
            duration_ms: duration,
            start_time: None,
            end_time: None,
            transcript,
            recording_url: None,
            summary: None,
            disconnection_reason: None,
            cost: None,
            analysis: None,
            logs: Vec::new(),
            metadata: BTreeMap::new(),
        };

        let first = render(&record);
        let second = render(&record);
        prop_assert_eq!(first.text, second.text);
        prop_assert_eq!(first.html, second.html);
    }
}
