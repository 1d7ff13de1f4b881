//! The Cache Key Builder interface.

/// Deterministic fingerprint of `(Filters, Highlights)`, used as the request
/// coordinator's opaque cache and in-flight key.
///
/// Requirements on implementations: deterministic, stable under key-order
/// permutation, arrays canonicalized, highlights distinguished from filters,
/// URL-safe. A small, pure string-derivation helper used purely as a map
/// key, never sent over the wire.
pub trait CacheKeyBuilder<F>: Send + Sync {
    fn build_key(&self, filters: &F, highlights: Option<&F>) -> String;
}

/// A `CacheKeyBuilder` built directly from a [`crate::mapper::FilterMapper`]:
/// it fingerprints the same canonical `Params` serialization the URL itself
/// would carry, with highlights folded in under a distinguishing prefix so a
/// filters-only fetch and a filters+highlights fetch never collide.
pub struct ParamsCacheKeyBuilder<M> {
    mapper: M,
}

impl<M> ParamsCacheKeyBuilder<M> {
    pub fn new(mapper: M) -> Self {
        Self { mapper }
    }
}

impl<F, M> CacheKeyBuilder<F> for ParamsCacheKeyBuilder<M>
where
    M: crate::mapper::FilterMapper<F>,
{
    fn build_key(&self, filters: &F, highlights: Option<&F>) -> String {
        let filters_part = self.mapper.to_url_params(filters).to_canonical_string();
        match highlights {
            None => filters_part,
            Some(h) => {
                let highlight_part = self.mapper.to_highlight_params(h).to_canonical_string();
                format!("{filters_part}#{highlight_part}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::test_support::{VehicleFilters, VehicleMapper};

    #[test]
    fn key_is_stable_and_distinguishes_highlights() {
        let builder = ParamsCacheKeyBuilder::new(VehicleMapper);
        let f = VehicleFilters { manufacturer: Some("Ford".into()), page: 1, size: 20, ..Default::default() };
        let k1 = builder.build_key(&f, None);
        let k2 = builder.build_key(&f, None);
        assert_eq!(k1, k2);

        let h = VehicleFilters { year_min: Some(2015), ..Default::default() };
        let k3 = builder.build_key(&f, Some(&h));
        assert_ne!(k1, k3);
    }
}
