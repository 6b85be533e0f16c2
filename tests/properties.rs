//! Property-based tests for slicer-meta
//!
//! Random headers, byte buffers and filament lists checked against the
//! invariants the parsers promise.

use proptest::prelude::*;
use slicer_meta::helpers::{format_duration, format_meters};
use slicer_meta::meta::{
    filter_used, parse_eta, FilamentInfo, HeaderLayout, SlicerMeta, SlicerType, ERROR, UNKNOWN,
};
use slicer_meta::sniffer::{sniff_bytes, SNIFF_WINDOW};
use slicer_meta::{DiagnosticKind, Diagnostics};

// ============================================================================
// Generators
// ============================================================================

/// Header lines assembled from tokens real headers are made of
fn header_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            "generated",
            "by",
            "ffslicer",
            "OrcaSlicer",
            "2.4.4",
            "on",
            "at",
            "05/04/25",
            "2025-05-12",
            "17:52:28",
            "5:52",
            "PM",
        ]),
        0..10,
    )
    .prop_map(|tokens| format!(";{}", tokens.join(" ")))
}

fn layout_strategy() -> impl Strategy<Value = HeaderLayout> {
    prop_oneof![Just(HeaderLayout::FlashPrint), Just(HeaderLayout::Orca)]
}

fn usage_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("0".to_string()),
        Just("0.00".to_string()),
        Just(String::new()),
        Just("n/a".to_string()),
        (0u32..100_000).prop_map(|n| format!("{:.2}", f64::from(n) / 100.0)),
    ]
}

fn filament_strategy() -> impl Strategy<Value = FilamentInfo> {
    (1u32..16, usage_strategy(), usage_strategy()).prop_map(|(id, used_m, used_g)| FilamentInfo {
        id: id.to_string(),
        filament_type: "PLA".to_string(),
        color: None,
        used_m,
        used_g,
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn sniffing_only_depends_on_the_window(
        content in prop::collection::vec(any::<u8>(), 0..2048)
    ) {
        let window = &content[..content.len().min(SNIFF_WINDOW)];

        let mut full = Diagnostics::new();
        let mut prefix = Diagnostics::new();
        prop_assert_eq!(sniff_bytes(&content, &mut full), sniff_bytes(window, &mut prefix));
        prop_assert_eq!(full, prefix);
    }

    #[test]
    fn sniffing_known_header_ignores_the_rest(
        tail in prop::collection::vec(any::<u8>(), 0..1024)
    ) {
        let mut content = b";generated by ffslicer 2.4.4 05/04/25 17:52:28\n".to_vec();
        content.extend_from_slice(&tail);

        let mut diagnostics = Diagnostics::new();
        prop_assert_eq!(sniff_bytes(&content, &mut diagnostics), SlicerType::FlashPrint);
        prop_assert!(diagnostics.is_empty());
    }

    #[test]
    fn meters_have_two_decimals(mm in 0u32..10_000_000) {
        let formatted = format_meters(f64::from(mm));
        let (_, decimals) = formatted.split_once('.').expect("decimal point");
        prop_assert_eq!(decimals.len(), 2);

        let value: f64 = formatted.parse().expect("number");
        prop_assert!((value - f64::from(mm) / 1000.0).abs() <= 0.005 + 1e-9);
    }

    #[test]
    fn filter_used_keeps_exactly_the_used_slots(
        filaments in prop::collection::vec(filament_strategy(), 0..12)
    ) {
        let used = filter_used(&filaments);
        let expected: Vec<FilamentInfo> =
            filaments.iter().filter(|f| f.is_used()).cloned().collect();

        prop_assert!(used.iter().all(FilamentInfo::is_used));
        prop_assert_eq!(used, expected);
    }

    #[test]
    fn header_fields_are_all_or_nothing(
        line in header_strategy(),
        layout in layout_strategy()
    ) {
        let mut diagnostics = Diagnostics::new();
        let meta = SlicerMeta::from_generated_by(SlicerType::OrcaFF, layout, &line, &mut diagnostics);

        if meta.has_header() {
            prop_assert_ne!(meta.slicer_name.as_str(), UNKNOWN);
            prop_assert_ne!(meta.slicer_version.as_str(), ERROR);
            prop_assert_ne!(meta.slice_date.as_str(), ERROR);
            prop_assert!(!diagnostics.contains(DiagnosticKind::MalformedHeader));
        } else {
            prop_assert_eq!(meta, SlicerMeta::default());
            prop_assert!(diagnostics.contains(DiagnosticKind::MalformedHeader));
        }
    }

    #[test]
    fn formatted_durations_parse_back(seconds in 1u64..1_000_000) {
        let eta = format_duration(seconds);
        let line = format!("; estimated printing time (normal mode) = {}", eta);
        prop_assert_eq!(parse_eta(&line), Some(eta));
    }
}
