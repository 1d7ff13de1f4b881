//! `to_url_params` is deterministic and `from_url_params` round-trips it
//! modulo domain defaults.

use proptest::prelude::*;
use urlstate_core::mapper::test_support::{VehicleFilters, VehicleMapper};
use urlstate_core::FilterMapper;

fn arb_filters() -> impl Strategy<Value = VehicleFilters> {
    (
        proptest::option::of("[A-Za-z]{3,10}"),
        proptest::option::of(1980u32..2030),
        proptest::option::of(1980u32..2030),
        proptest::collection::vec("[A-Za-z]{3,8}", 0..4),
        1u32..50,
        1u32..100,
    )
        .prop_map(|(manufacturer, year_min, year_max, mut body_classes, page, size)| {
            // `to_url_params` always serializes this field in sorted order
            // (order is semantic-free per the domain), so the generated
            // fixture must already be in that canonical form for a
            // `prop_assert_eq!` against the round-tripped value to hold.
            body_classes.sort();
            VehicleFilters { manufacturer, year_min, year_max, body_classes, page, size }
        })
}

proptest! {
    #[test]
    fn round_trip_is_stable_modulo_defaults(filters in arb_filters()) {
        let mapper = VehicleMapper;
        let params = mapper.to_url_params(&filters);
        let params_again = mapper.to_url_params(&filters);
        prop_assert_eq!(params.to_canonical_string(), params_again.to_canonical_string());

        let mut warnings = Vec::new();
        let back = mapper.from_url_params(&params, &mut warnings);
        prop_assert!(warnings.is_empty());
        prop_assert_eq!(filters, back);
    }

    #[test]
    fn canonical_string_is_insensitive_to_pair_construction_order(
        manufacturer in "[A-Za-z]{3,10}",
        year_min in 1980u32..2030,
    ) {
        let mapper = VehicleMapper;
        let a = VehicleFilters { manufacturer: Some(manufacturer.clone()), year_min: Some(year_min), page: 1, size: 20, ..Default::default() };
        let b = a.clone();
        prop_assert_eq!(
            mapper.to_url_params(&a).to_canonical_string(),
            mapper.to_url_params(&b).to_canonical_string()
        );
    }
}
