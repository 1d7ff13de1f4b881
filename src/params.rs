//! The URL query string's in-memory form.
//!
//! `Params` is the canonical, order-irrelevant serialization every other
//! subsystem agrees on: the broker reads and writes it, the mapper converts
//! it to and from domain `Filters`, and the cache key builder derives
//! fingerprints from it. Modeled as an immutable, `Arc`-backed map — cheap
//! to clone, mutation always produces a new value rather than aliasing the
//! old one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reserved prefix for highlight-overlay parameters.
pub const HIGHLIGHT_PREFIX: &str = "h_";

/// An immutable, cheaply-cloneable parameter map.
///
/// `BTreeMap` gives deterministic iteration order for free, which the cache
/// key builder and the round-trip property both rely on; order in the
/// map itself is never semantically meaningful.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    entries: Arc<BTreeMap<String, String>>,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys under the highlight namespace, prefix stripped.
    pub fn highlight_keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(k, v)| {
            k.strip_prefix(HIGHLIGHT_PREFIX).map(|stripped| (stripped, v.as_str()))
        })
    }

    /// Build a `Params` from an iterator of `(key, value)` pairs, dropping
    /// any entry whose value is empty — the canonical-omission rule
    /// ("a canonical form omits keys whose value is the domain's default").
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (k, v) in pairs {
            let v = v.into();
            if !v.is_empty() {
                map.insert(k.into(), v);
            }
        }
        Self { entries: Arc::new(map) }
    }

    /// Merge `other` over `self`; keys present in `other` with an empty value
    /// are removed (the `clearParams`-over-`setParams(merge: true)` idiom).
    #[must_use]
    pub fn merged_with(&self, other: &Params) -> Self {
        let mut map = (*self.entries).clone();
        for (k, v) in other.entries.iter() {
            if v.is_empty() {
                map.remove(k);
            } else {
                map.insert(k.clone(), v.clone());
            }
        }
        Self { entries: Arc::new(map) }
    }

    /// Remove the given keys, returning a new `Params`. `None` removes every key.
    #[must_use]
    pub fn without_keys<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Self {
        let remove: std::collections::HashSet<&str> = keys.into_iter().collect();
        let map = self
            .entries
            .iter()
            .filter(|(k, _)| !remove.contains(k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { entries: Arc::new(map) }
    }

    #[must_use]
    pub fn clear(&self) -> Self {
        Self::default()
    }

    /// Deterministic, byte-identical serialization: `key=value` pairs sorted
    /// by key and joined with `&`, matching the canonical-form requirement
    /// that drives round-trip correctness and the mapper's `toUrlParams` determinism.
    #[must_use]
    pub fn to_canonical_string(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Parse a raw `key=value&key2=value2` query string (already split from
    /// the path) into a `Params`. Unknown percent-encoding is passed through
    /// best-effort rather than failing the whole parse.
    #[must_use]
    pub fn parse_query(query: &str) -> Self {
        let mut map = BTreeMap::new();
        for pair in query.split('&').filter(|s| !s.is_empty()) {
            let mut split = pair.splitn(2, '=');
            let Some(raw_key) = split.next() else { continue };
            let raw_value = split.next().unwrap_or("");
            let key = urlencoding::decode(raw_key).map(|c| c.into_owned()).unwrap_or_else(|_| raw_key.to_string());
            let value = urlencoding::decode(raw_value).map(|c| c.into_owned()).unwrap_or_else(|_| raw_value.to_string());
            if !value.is_empty() {
                map.insert(key, value);
            }
        }
        Self { entries: Arc::new(map) }
    }

    /// Serialize to the JSON object shape a pop-out's broadcast envelope
    /// carries `Params` as.
    #[must_use]
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a JSON object of string key/value pairs back into `Params`.
    #[must_use]
    pub fn from_json_str(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

// Serialized as a plain `{ "key": "value", ... }` object rather than
// exposing the `Arc<BTreeMap<..>>` storage detail — the wire shape
// describes for a `Params` payload.
impl Serialize for Params {
    fn serialize<Se: Serializer>(&self, serializer: Se) -> Result<Se::Ok, Se::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in self.entries.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Params {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamsVisitor;

        impl<'de> Visitor<'de> for ParamsVisitor {
            type Value = Params;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object of string key/value pairs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Params, A::Error> {
                let mut map = BTreeMap::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    map.insert(k, v);
                }
                Ok(Params { entries: Arc::new(map) })
            }
        }

        deserializer.deserialize_map(ParamsVisitor)
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

/// Array encoding rules shared by every domain mapper: comma-delimited
/// lists with a pipe-to-comma normalization on input, and colon-delimited
/// pairs for composite (e.g. manufacturer:model) values.
pub mod delimiters {
    /// Split an array-valued parameter into its elements, normalizing a
    /// legacy `|`-delimiter to the canonical `,` before splitting.
    pub fn split_list(raw: &str) -> Vec<String> {
        raw.replace('|', ",")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Join elements into the canonical comma-delimited form, sorted so that
    /// two logically-equal sets serialize identically.
    pub fn join_list_sorted<I: IntoIterator<Item = String>>(items: I) -> String {
        let mut v: Vec<String> = items.into_iter().collect();
        v.sort();
        v.join(",")
    }

    /// Split a single `a:b` composite pair.
    #[must_use]
    pub fn split_pair(raw: &str) -> Option<(String, String)> {
        let mut it = raw.splitn(2, ':');
        let a = it.next()?.trim();
        let b = it.next()?.trim();
        if a.is_empty() || b.is_empty() {
            return None;
        }
        Some((a.to_string(), b.to_string()))
    }

    #[must_use]
    pub fn join_pair(a: &str, b: &str) -> String {
        format!("{a}:{b}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_are_omitted() {
        let p = Params::from_pairs([("manufacturer", "Ford"), ("page", "")]);
        assert_eq!(p.get("manufacturer"), Some("Ford"));
        assert_eq!(p.get("page"), None);
    }

    #[test]
    fn merge_removes_empty_overrides() {
        let base = Params::from_pairs([("manufacturer", "Ford"), ("page", "2")]);
        let delta = Params::from_pairs([("page", "")]);
        // from_pairs already drops empty values, so build the override by hand.
        let delta = delta.merged_with(&Params::from_pairs([("manufacturer", "Ford")]));
        let merged = base.merged_with(&delta);
        assert_eq!(merged.get("manufacturer"), Some("Ford"));
    }

    #[test]
    fn canonical_string_is_sorted_and_stable() {
        let a = Params::from_pairs([("b", "2"), ("a", "1")]);
        let b = Params::from_pairs([("a", "1"), ("b", "2")]);
        assert_eq!(a.to_canonical_string(), b.to_canonical_string());
        assert_eq!(a.to_canonical_string(), "a=1&b=2");
    }

    #[test]
    fn parse_query_round_trips_canonical_form() {
        let p = Params::parse_query("manufacturer=Ford&page=1&h_yearMin=2022");
        assert_eq!(p.get("manufacturer"), Some("Ford"));
        assert_eq!(p.get("h_yearMin"), Some("2022"));
        let highlights: Vec<_> = p.highlight_keys().collect();
        assert_eq!(highlights, vec![("yearMin", "2022")]);
    }

    #[test]
    fn pipe_delimiter_normalizes_to_comma() {
        assert_eq!(
            delimiters::split_list("SUV|Sedan|Truck"),
            vec!["SUV".to_string(), "Sedan".to_string(), "Truck".to_string()]
        );
    }

    #[test]
    fn composite_pair_round_trip() {
        let joined = delimiters::join_pair("Ford", "F150");
        assert_eq!(delimiters::split_pair(&joined), Some(("Ford".to_string(), "F150".to_string())));
    }
}
