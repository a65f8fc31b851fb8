//! Dimension signatures.
//!
//! A signature is the canonical map from base dimension to total
//! exponent for a term list; it is the invariant preserved by unit
//! conversion and the ground truth for compatibility checks. `m/s` and
//! `ft/hr` share `{length: 1, time: -1}`, and so do `Hz·m` — that is by
//! design, compatibility is exact signature equality and nothing finer.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::registry::UnitRegistry;
use crate::terms::UnitTerm;
use crate::{ReckonResult, ReckonUnwrap};

/// Returns true for dimension ids that act as their own base dimension
/// and never expand: currency, currency-symbol sentinels, and
/// user-defined units.
#[inline]
#[must_use]
pub(crate) fn is_special_dimension(id: &str) -> bool {
    id == "currency" || id.starts_with("currency_symbol_") || id.starts_with("user_defined_")
}

/// A canonical base-dimension signature. Zero entries are elided.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Signature {
    map: FxHashMap<String, f64>,
}

impl Signature {
    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The sole `(base dimension, exponent)` entry, if there is exactly one.
    pub(crate) fn single_entry(&self) -> Option<(&str, f64)> {
        if self.map.len() == 1 {
            self.map.iter().next().map(|(k, v)| (k.as_str(), *v))
        } else {
            None
        }
    }

    pub(crate) fn exponent_of(&self, dimension: &str) -> f64 {
        self.map.get(dimension).copied().unwrap_or(0.0)
    }

    /// All `(base dimension, exponent)` entries, unordered.
    pub(crate) fn entries(&self) -> Vec<(&str, f64)> {
        self.map.iter().map(|(k, v)| (k.as_str(), *v)).collect()
    }

    fn accumulate(&mut self, dimension: &str, exponent: f64) {
        let entry = self.map.entry(dimension.to_owned()).or_insert(0.0);
        *entry += exponent;
        if *entry == 0.0 {
            self.map.remove(dimension);
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.map.is_empty() {
            return f.write_str("dimensionless");
        }
        let mut entries: Vec<(&str, f64)> =
            self.map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (i, (dimension, exponent)) in entries.into_iter().enumerate() {
            if i > 0 {
                f.write_str("·")?;
            }
            if (exponent - 1.0).abs() < f64::EPSILON {
                write!(f, "{dimension}")?;
            } else {
                write!(f, "{dimension}^{exponent}")?;
            }
        }
        Ok(())
    }
}

/// Computes the signature of a term list by expanding every term's
/// dimension down to base dimensions.
pub(crate) fn signature_of(registry: &UnitRegistry, terms: &[UnitTerm]) -> ReckonResult<Signature> {
    let mut signature = Signature::default();
    for term in terms {
        expand_into(registry, &term.unit.dimension, term.exponent, &mut signature)?;
    }
    Ok(signature)
}

/// Computes the base signature of a single dimension id.
pub(crate) fn dimension_signature(
    registry: &UnitRegistry,
    dimension: &str,
) -> ReckonResult<Signature> {
    let mut signature = Signature::default();
    expand_into(registry, dimension, 1.0, &mut signature)?;
    Ok(signature)
}

fn expand_into(
    registry: &UnitRegistry,
    dimension: &str,
    exponent: f64,
    signature: &mut Signature,
) -> ReckonResult<()> {
    if is_special_dimension(dimension) {
        signature.accumulate(dimension, exponent);
        return Ok(());
    }
    // A missing non-special dimension means the registry itself is
    // inconsistent, which is a programmer error rather than user input.
    let record = registry.dimension_by_id(dimension).reckon_unwrap()?;
    if record.is_base() {
        signature.accumulate(dimension, exponent);
        return Ok(());
    }
    for (inner, inner_exponent) in &record.derived_from {
        expand_into(registry, inner, exponent * inner_exponent, signature)?;
    }
    Ok(())
}

/// Exact signature equality; the compatibility test used by additive and
/// comparison operations.
pub(crate) fn compatible(
    registry: &UnitRegistry,
    left: &[UnitTerm],
    right: &[UnitTerm],
) -> ReckonResult<bool> {
    Ok(signature_of(registry, left)? == signature_of(registry, right)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terms::UnitTerm;

    fn term(registry: &UnitRegistry, id: &str, exponent: f64) -> UnitTerm {
        UnitTerm::new(registry.unit_by_id(id).expect("unit"), exponent)
    }

    #[test]
    fn base_and_derived_dimensions_expand() {
        let registry = UnitRegistry::builtin();
        let velocity = signature_of(
            &registry,
            &[term(&registry, "kilometer", 1.0), term(&registry, "hour", -1.0)],
        )
        .expect("signature");
        assert_eq!(velocity.exponent_of("length"), 1.0);
        assert_eq!(velocity.exponent_of("time"), -1.0);

        let newton = signature_of(&registry, &[term(&registry, "newton", 1.0)]).expect("signature");
        assert_eq!(newton.exponent_of("mass"), 1.0);
        assert_eq!(newton.exponent_of("length"), 1.0);
        assert_eq!(newton.exponent_of("time"), -2.0);
    }

    #[test]
    fn different_spellings_share_a_signature() {
        let registry = UnitRegistry::builtin();
        let mps = [term(&registry, "meter", 1.0), term(&registry, "second", -1.0)];
        let fthr = [term(&registry, "foot", 1.0), term(&registry, "hour", -1.0)];
        let hz_m = [term(&registry, "hertz", 1.0), term(&registry, "meter", 1.0)];
        assert!(compatible(&registry, &mps, &fthr).expect("compatible"));
        // `Hz·m` matches `m/s` as well; compatibility is signature-only.
        assert!(compatible(&registry, &mps, &hz_m).expect("compatible"));
    }

    #[test]
    fn exponents_cancel_to_empty() {
        let registry = UnitRegistry::builtin();
        let cancelled = signature_of(
            &registry,
            &[term(&registry, "meter", 2.0), term(&registry, "square_meter", -1.0)],
        )
        .expect("signature");
        assert!(cancelled.is_empty());
    }

    #[test]
    fn special_dimensions_do_not_expand() {
        let registry = UnitRegistry::builtin();
        let sentinel = registry
            .ambiguous_currency_by_symbol("$")
            .expect("sentinel unit");
        let signature =
            signature_of(&registry, &[UnitTerm::new(sentinel, 1.0)]).expect("signature");
        assert_eq!(signature.exponent_of("currency_symbol_$"), 1.0);
        assert_eq!(signature.entries().len(), 1);
    }

    #[test]
    fn signatures_display_sorted() {
        let registry = UnitRegistry::builtin();
        let newton = signature_of(&registry, &[term(&registry, "newton", 1.0)]).expect("signature");
        assert_eq!(newton.to_string(), "length·mass·time^-2");
    }
}
