//! The Filter/URL Mapper interface.

use crate::error::MapperWarning;
use crate::params::Params;

/// Bidirectional conversion between a domain's `Filters` and the URL's
/// `Params`, plus highlight extraction. Entirely domain-owned: the core only
/// calls through this trait, never inspects `F`.
///
/// Implementors MUST satisfy the round-trip property:
/// `from_url_params(to_url_params(f))` deep-equals `f` modulo default-valued
/// fields, and `to_url_params` MUST be deterministic (two logically-equal
/// filter states serialize to byte-identical `Params`).
pub trait FilterMapper<F>: Send + Sync {
    /// Serialize `filters` into `Params`, omitting default-valued fields.
    fn to_url_params(&self, filters: &F) -> Params;

    /// Parse `Params` into `F`. Total over valid inputs: unknown keys are
    /// ignored, and a malformed value coerces to that field's default,
    /// pushing a [`MapperWarning`] rather than returning an error.
    fn from_url_params(&self, params: &Params, warnings: &mut Vec<MapperWarning>) -> F;

    /// The domain's all-defaults `Filters` value. Used both to seed a fresh
    /// orchestrator and to serialize `clearFilters()`.
    fn default_filters(&self) -> F;

    /// Extract the `h_`-prefixed highlight overlay from `params`.
    /// The default implementation returns `None`, meaning "this domain has
    /// no highlights" — overriding it is how a domain opts in.
    fn extract_highlights(&self, _params: &Params, _warnings: &mut Vec<MapperWarning>) -> Option<F> {
        None
    }

    /// Serialize a highlight overlay back into `h_`-prefixed `Params`, merged
    /// with any non-highlight params the caller already has. Only needs a
    /// meaningful implementation alongside a non-default `extract_highlights`.
    fn to_highlight_params(&self, _highlights: &F) -> Params {
        Params::new()
    }
}

/// A concrete domain mapper used across this crate's own tests and available
/// to downstream integration tests under the `test-util` feature.
#[cfg(any(test, feature = "test-util"))]
pub mod test_support {
    use super::*;
    use crate::params::delimiters;

    /// A tiny vehicle-domain mapper used across this crate's tests — not
    /// part of the public API, but a concrete `FilterMapper` impl exercises
    /// the trait the way a real domain adapter would.
    #[derive(Clone, Debug, PartialEq, Eq, Default)]
    pub struct VehicleFilters {
        pub manufacturer: Option<String>,
        pub year_min: Option<u32>,
        pub year_max: Option<u32>,
        pub body_classes: Vec<String>,
        pub page: u32,
        pub size: u32,
    }

    pub struct VehicleMapper;

    impl FilterMapper<VehicleFilters> for VehicleMapper {
        fn to_url_params(&self, f: &VehicleFilters) -> Params {
            let mut pairs: Vec<(String, String)> = Vec::new();
            if let Some(m) = &f.manufacturer {
                pairs.push(("manufacturer".into(), m.clone()));
            }
            if let Some(y) = f.year_min {
                pairs.push(("yearMin".into(), y.to_string()));
            }
            if let Some(y) = f.year_max {
                pairs.push(("yearMax".into(), y.to_string()));
            }
            if !f.body_classes.is_empty() {
                pairs.push((
                    "bodyClass".into(),
                    delimiters::join_list_sorted(f.body_classes.iter().cloned()),
                ));
            }
            if f.page != 1 {
                pairs.push(("page".into(), f.page.to_string()));
            }
            if f.size != 20 {
                pairs.push(("size".into(), f.size.to_string()));
            }
            Params::from_pairs(pairs)
        }

        fn from_url_params(&self, params: &Params, warnings: &mut Vec<MapperWarning>) -> VehicleFilters {
            fn parse_u32(params: &Params, key: &str, default: u32, warnings: &mut Vec<MapperWarning>) -> u32 {
                match params.get(key) {
                    None => default,
                    Some(v) => v.parse().unwrap_or_else(|_| {
                        warnings.push(MapperWarning { key: key.to_string(), value: v.to_string() });
                        default
                    }),
                }
            }
            fn parse_opt_u32(params: &Params, key: &str, warnings: &mut Vec<MapperWarning>) -> Option<u32> {
                params.get(key).map(|v| match v.parse() {
                    Ok(n) => n,
                    Err(_) => {
                        warnings.push(MapperWarning { key: key.to_string(), value: v.to_string() });
                        0
                    }
                })
            }
            VehicleFilters {
                manufacturer: params.get("manufacturer").map(str::to_string),
                year_min: parse_opt_u32(params, "yearMin", warnings),
                year_max: parse_opt_u32(params, "yearMax", warnings),
                body_classes: params
                    .get("bodyClass")
                    .map(delimiters::split_list)
                    .unwrap_or_default(),
                page: parse_u32(params, "page", 1, warnings),
                size: parse_u32(params, "size", 20, warnings),
            }
        }

        fn default_filters(&self) -> VehicleFilters {
            VehicleFilters { page: 1, size: 20, ..Default::default() }
        }

        fn extract_highlights(&self, params: &Params, warnings: &mut Vec<MapperWarning>) -> Option<VehicleFilters> {
            let highlight_params = Params::from_pairs(
                params.highlight_keys().map(|(k, v)| (k.to_string(), v.to_string())),
            );
            if highlight_params.is_empty() {
                return None;
            }
            Some(self.from_url_params(&highlight_params, warnings))
        }

        fn to_highlight_params(&self, highlights: &VehicleFilters) -> Params {
            let plain = self.to_url_params(highlights);
            Params::from_pairs(plain.iter().map(|(k, v)| (format!("h_{k}"), v.to_string())))
        }
    }

    #[test]
    fn round_trip_modulo_defaults() {
        let mapper = VehicleMapper;
        let f = VehicleFilters {
            manufacturer: Some("Ford".into()),
            year_min: Some(2020),
            year_max: Some(2024),
            body_classes: vec!["SUV".into(), "Sedan".into()],
            page: 1,
            size: 20,
        };
        let params = mapper.to_url_params(&f);
        let mut warnings = Vec::new();
        let back = mapper.from_url_params(&params, &mut warnings);
        assert_eq!(f, back);
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_keys_ignored_and_invalid_ints_coerce_with_warning() {
        let mapper = VehicleMapper;
        let params = Params::from_pairs([("yearMin", "not-a-number"), ("unknownKey", "x")]);
        let mut warnings = Vec::new();
        let f = mapper.from_url_params(&params, &mut warnings);
        assert_eq!(f.year_min, Some(0));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key, "yearMin");
    }

    #[test]
    fn highlight_extraction_round_trips_through_prefix() {
        let mapper = VehicleMapper;
        let params = Params::from_pairs([("h_yearMin", "2015")]);
        let mut warnings = Vec::new();
        let highlights = mapper.extract_highlights(&params, &mut warnings).unwrap();
        assert_eq!(highlights.year_min, Some(2015));
        let back = mapper.to_highlight_params(&highlights);
        assert_eq!(back.get("h_yearMin"), Some("2015"));
    }
}
