//! The unit term algebra.
//!
//! A term list is the `(unit, exponent)` product attached to a Numeric.
//! Multiplication and division compose term lists; this module owns the
//! three passes they share:
//!
//! - [`combine`] merges two lists by unit id,
//! - [`simplify`] collapses same-dimension entries (`m·cm` → `m²`),
//! - [`reduce`] is the heuristic pass that makes results look natural,
//!   consolidating single-base groups and matching named derived
//!   dimensions (`kg·m/s²` → `N`).
//!
//! Term lists are ordered (the author's spelling survives in display) but
//! canonical after every operation: no unit id appears twice and no
//! exponent is zero.

use std::sync::Arc;

use crate::dimension;
use crate::options::UnitVariant;
use crate::registry::{Unit, UnitRegistry};
use crate::{ReckonResult, ReckonUnwrap};

/// The comparison tolerance for factor matching during reduction.
const FACTOR_EPSILON: f64 = 1e-9;

/// One `(unit, exponent)` entry of a Numeric's term list.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTerm {
    /// The unit.
    pub unit: Arc<Unit>,
    /// The exponent; never zero in a canonical list.
    pub exponent: f64,
}

impl UnitTerm {
    /// Creates a term.
    #[inline]
    #[must_use]
    pub fn new(unit: Arc<Unit>, exponent: f64) -> Self {
        Self { unit, exponent }
    }

    /// Creates an exponent-1 term.
    #[inline]
    #[must_use]
    pub fn simple(unit: Arc<Unit>) -> Self {
        Self::new(unit, 1.0)
    }
}

/// Returns the list with every exponent negated, for division.
#[must_use]
pub(crate) fn negate(terms: &[UnitTerm]) -> Vec<UnitTerm> {
    terms
        .iter()
        .map(|t| UnitTerm::new(t.unit.clone(), -t.exponent))
        .collect()
}

/// Merges two term lists by unit id, summing exponents and dropping
/// entries that cancel. Left-hand order is preserved; unseen right-hand
/// units append in order.
#[must_use]
pub(crate) fn combine(left: &[UnitTerm], right: &[UnitTerm]) -> Vec<UnitTerm> {
    let mut merged: Vec<UnitTerm> = left.to_vec();
    for term in right {
        if let Some(existing) = merged.iter_mut().find(|t| t.unit.id == term.unit.id) {
            existing.exponent += term.exponent;
        } else {
            merged.push(term.clone());
        }
    }
    merged.retain(|t| t.exponent != 0.0);
    merged
}

/// Collapses entries that share a dimension into one representative term
/// (the group's first unit) at the summed exponent. Returns the
/// simplified list and the numeric multiplier that keeps the value
/// invariant (`1 m × 1 cm` simplifies to `m²` with multiplier `0.01`).
#[must_use]
pub(crate) fn simplify(terms: &[UnitTerm], variant: UnitVariant) -> (Vec<UnitTerm>, f64) {
    let mut groups: Vec<(&str, Vec<&UnitTerm>)> = Vec::new();
    for term in terms {
        match groups.iter_mut().find(|(d, _)| *d == term.unit.dimension) {
            Some((_, members)) => members.push(term),
            None => groups.push((term.unit.dimension.as_str(), vec![term])),
        }
    }

    let mut simplified = Vec::with_capacity(groups.len());
    let mut multiplier = 1.0;
    for (_, members) in groups {
        if members.len() == 1 {
            simplified.push(members[0].clone());
            continue;
        }
        let total: f64 = members.iter().map(|t| t.exponent).sum();
        let mut combined_factor = 1.0;
        for member in &members {
            combined_factor *= member.unit.factor(variant).powf(member.exponent);
        }
        if total == 0.0 {
            multiplier *= combined_factor;
            continue;
        }
        let representative = members[0].unit.clone();
        multiplier *= combined_factor / representative.factor(variant).powf(total);
        simplified.push(UnitTerm::new(representative, total));
    }
    (simplified, multiplier)
}

/// Expands every term whose unit belongs to a derived dimension into the
/// base-dimension base units, returning the expanded list and the factor
/// that maps the value into it. `(1 L)^⅓` goes through `0.001 m³` so the
/// exponent lands on `m`, not on `L`.
pub(crate) fn expand_to_base(
    registry: &UnitRegistry,
    terms: &[UnitTerm],
    variant: UnitVariant,
) -> ReckonResult<(Vec<UnitTerm>, f64)> {
    let mut expanded: Vec<UnitTerm> = Vec::new();
    let mut factor = 1.0;
    for term in terms {
        if term.unit.is_special() {
            expanded = combine(&expanded, std::slice::from_ref(term));
            continue;
        }
        let record = registry.dimension_by_id(&term.unit.dimension).reckon_unwrap()?;
        if record.is_base() {
            let base_unit = registry.unit_by_id(&record.base_unit).reckon_unwrap()?;
            factor *= (term.unit.factor(variant) / base_unit.factor(variant)).powf(term.exponent);
            expanded = combine(&expanded, &[UnitTerm::new(base_unit, term.exponent)]);
            continue;
        }
        factor *= term.unit.factor(variant).powf(term.exponent);
        let signature = dimension::dimension_signature(registry, &term.unit.dimension)?;
        let mut pieces = Vec::new();
        for (base_dimension, base_exponent) in signature.entries() {
            let base_record = registry.dimension_by_id(base_dimension).reckon_unwrap()?;
            let base_unit = registry.unit_by_id(&base_record.base_unit).reckon_unwrap()?;
            pieces.push(UnitTerm::new(base_unit, base_exponent * term.exponent));
        }
        // Deterministic order for the expansion itself.
        pieces.sort_by(|a, b| a.unit.id.cmp(&b.unit.id));
        expanded = combine(&expanded, &pieces);
    }
    Ok((expanded, factor))
}

/// The post-multiplication reduction pass.
///
/// `left` and `right` are the original operand term lists; reduction is
/// skipped entirely when either operand was dimensionless, so scaling a
/// velocity by 2 never reshapes it. Returns the reduced list and the
/// adjusted value.
pub(crate) fn reduce(
    registry: &UnitRegistry,
    terms: Vec<UnitTerm>,
    value: f64,
    left: &[UnitTerm],
    right: &[UnitTerm],
    variant: UnitVariant,
) -> ReckonResult<(Vec<UnitTerm>, f64)> {
    if terms.len() <= 1 || left.is_empty() || right.is_empty() {
        return Ok((terms, value));
    }
    if terms.iter().any(|t| t.unit.is_special()) {
        return Ok((terms, value));
    }

    let (terms, value) = consolidate_single_base(registry, terms, value, variant)?;
    if terms.len() <= 1 {
        return Ok((terms, value));
    }

    let signature = dimension::signature_of(registry, &terms)?;
    if signature.is_empty() {
        return Ok((terms, value));
    }

    if let Some(named) = registry.dimension_by_signature(&signature) {
        let base_unit = registry.unit_by_id(&named.base_unit).reckon_unwrap()?;
        if usize::from(base_unit.count_as_terms) < terms.len() {
            log::debug!("reducing {} terms to {}", terms.len(), named.id);
            let current = combined_factor(&terms, variant);
            let value = value * current / base_unit.factor(variant);
            return Ok((vec![UnitTerm::simple(base_unit)], value));
        }
        return Ok((terms, value));
    }

    if let Some((base_dimension, exponent)) = signature.single_entry() {
        let record = registry.dimension_by_id(base_dimension).reckon_unwrap()?;
        let base_unit = registry.unit_by_id(&record.base_unit).reckon_unwrap()?;
        let current = combined_factor(&terms, variant);
        let value = value * current / base_unit.factor(variant).powf(exponent);
        return Ok((vec![UnitTerm::new(base_unit, exponent)], value));
    }

    Ok((terms, value))
}

fn combined_factor(terms: &[UnitTerm], variant: UnitVariant) -> f64 {
    terms
        .iter()
        .map(|t| t.unit.factor(variant).powf(t.exponent))
        .product()
}

/// Consolidates groups of terms whose dimensions expand to the same
/// single base dimension. `L/m²` becomes `mm` because liter expands to
/// `length³` and a length unit with the right factor exists; `L/m³`
/// cancels into the value outright.
fn consolidate_single_base(
    registry: &UnitRegistry,
    terms: Vec<UnitTerm>,
    value: f64,
    variant: UnitVariant,
) -> ReckonResult<(Vec<UnitTerm>, f64)> {
    // (base dimension, base exponent of the term's own dimension)
    let mut bases: Vec<Option<(String, f64)>> = Vec::with_capacity(terms.len());
    for term in &terms {
        if term.unit.is_special() {
            bases.push(None);
            continue;
        }
        let signature = dimension::dimension_signature(registry, &term.unit.dimension)?;
        bases.push(
            signature
                .single_entry()
                .map(|(dimension, exponent)| (dimension.to_owned(), exponent)),
        );
    }

    let mut value = value;
    let mut visited = vec![false; terms.len()];
    let mut consumed = vec![false; terms.len()];
    let mut replacements: Vec<(usize, Option<UnitTerm>)> = Vec::new();

    for i in 0..terms.len() {
        if visited[i] {
            continue;
        }
        let Some((base_dimension, _)) = &bases[i] else {
            continue;
        };
        let members: Vec<usize> = (i..terms.len())
            .filter(|&j| {
                bases[j]
                    .as_ref()
                    .is_some_and(|(d, _)| d == base_dimension)
            })
            .collect();
        for &j in &members {
            visited[j] = true;
        }
        if members.len() < 2 {
            continue;
        }

        let mut total_base_exponent = 0.0;
        let mut group_factor = 1.0;
        for &j in &members {
            let base_exponent = bases[j].as_ref().map(|(_, e)| *e).reckon_unwrap()?;
            total_base_exponent += terms[j].exponent * base_exponent;
            group_factor *= terms[j].unit.factor(variant).powf(terms[j].exponent);
        }

        if total_base_exponent == 0.0 {
            value *= group_factor;
            for &j in &members {
                consumed[j] = true;
            }
            replacements.push((i, None));
            continue;
        }

        let candidates = registry.units_by_dimension(base_dimension);
        let matched = candidates.iter().find(|u| {
            approx_eq(u.factor(variant).powf(total_base_exponent), group_factor)
        });
        if let Some(unit) = matched {
            value *= group_factor / unit.factor(variant).powf(total_base_exponent);
            for &j in &members {
                consumed[j] = true;
            }
            replacements.push((i, Some(UnitTerm::new(unit.clone(), total_base_exponent))));
        }
    }

    if replacements.is_empty() {
        return Ok((terms, value));
    }

    let mut reduced = Vec::with_capacity(terms.len());
    for (i, term) in terms.iter().enumerate() {
        if let Some(position) = replacements.iter().position(|(at, _)| *at == i) {
            if let (_, Some(replacement)) = &replacements[position] {
                reduced.push(replacement.clone());
            }
            continue;
        }
        if !consumed[i] {
            reduced.push(term.clone());
        }
    }
    Ok((reduced, value))
}

#[inline]
fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= FACTOR_EPSILON * a.abs().max(b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> UnitRegistry {
        UnitRegistry::builtin()
    }

    fn term(registry: &UnitRegistry, id: &str, exponent: f64) -> UnitTerm {
        UnitTerm::new(registry.unit_by_id(id).expect("unit"), exponent)
    }

    #[test]
    fn combine_merges_and_cancels() {
        let r = registry();
        let left = [term(&r, "meter", 1.0), term(&r, "second", -1.0)];
        let right = [term(&r, "second", 1.0), term(&r, "kilogram", 1.0)];
        let merged = combine(&left, &right);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].unit.id, "meter");
        assert_eq!(merged[1].unit.id, "kilogram");
    }

    #[test]
    fn simplify_is_canonical_and_idempotent() {
        let r = registry();
        let raw = [term(&r, "meter", 1.0), term(&r, "centimeter", 1.0)];
        let (once, multiplier) = simplify(&raw, UnitVariant::Us);
        assert_eq!(once.len(), 1);
        assert_eq!(once[0].unit.id, "meter");
        assert_eq!(once[0].exponent, 2.0);
        assert!((multiplier - 0.01).abs() < 1e-12);

        let (twice, again) = simplify(&once, UnitVariant::Us);
        assert_eq!(twice, once);
        assert_eq!(again, 1.0);
    }

    #[test]
    fn simplify_cancels_opposed_exponents() {
        let r = registry();
        let raw = [term(&r, "kilometer", 1.0), term(&r, "meter", -1.0)];
        let (simplified, multiplier) = simplify(&raw, UnitVariant::Us);
        assert!(simplified.is_empty());
        assert!((multiplier - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn reduce_matches_named_force_dimension() {
        let r = registry();
        let product = vec![
            term(&r, "meter", 1.0),
            term(&r, "second", -2.0),
            term(&r, "kilogram", 1.0),
        ];
        let left = [term(&r, "meter", 1.0), term(&r, "second", -2.0)];
        let right = [term(&r, "kilogram", 1.0)];
        let (reduced, value) =
            reduce(&r, product, 19.6, &left, &right, UnitVariant::Us).expect("reduce");
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].unit.id, "newton");
        assert!((value - 19.6).abs() < 1e-9);
    }

    #[test]
    fn reduce_leaves_velocity_spellings_alone() {
        let r = registry();
        let product = vec![term(&r, "kilometer", 1.0), term(&r, "hour", -1.0)];
        let left = [term(&r, "kilometer", 1.0)];
        let right = [term(&r, "hour", 1.0)];
        let (reduced, value) =
            reduce(&r, product.clone(), 1.5, &left, &right, UnitVariant::Us).expect("reduce");
        // `m/s` counts as two terms, so `km/hr` keeps its spelling.
        assert_eq!(reduced, product);
        assert_eq!(value, 1.5);
    }

    #[test]
    fn reduce_skips_dimensionless_operands() {
        let r = registry();
        let product = vec![term(&r, "kilometer", 1.0), term(&r, "hour", -1.0)];
        let left = product.clone();
        let (reduced, value) =
            reduce(&r, product.clone(), 60.0, &left, &[], UnitVariant::Us).expect("reduce");
        assert_eq!(reduced, product);
        assert_eq!(value, 60.0);
    }

    #[test]
    fn consolidation_finds_a_factor_match() {
        let r = registry();
        // liter / m² expands to length¹ with factor 0.001: millimeter.
        let product = vec![term(&r, "liter", 1.0), term(&r, "square_meter", -1.0)];
        let left = [term(&r, "liter", 1.0)];
        let right = [term(&r, "square_meter", 1.0)];
        let (reduced, value) =
            reduce(&r, product, 1.0, &left, &right, UnitVariant::Us).expect("reduce");
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[0].unit.id, "millimeter");
        assert_eq!(reduced[0].exponent, 1.0);
        assert!((value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn consolidation_cancels_matching_volumes() {
        let r = registry();
        let product = vec![term(&r, "liter", 1.0), term(&r, "cubic_meter", -1.0)];
        let left = [term(&r, "liter", 1.0)];
        let right = [term(&r, "cubic_meter", 1.0)];
        let (reduced, value) =
            reduce(&r, product, 2.0, &left, &right, UnitVariant::Us).expect("reduce");
        assert!(reduced.is_empty());
        assert!((value - 0.002).abs() < 1e-12);
    }

    #[test]
    fn reduce_never_touches_currency_terms() {
        let r = registry();
        let rates = crate::ExchangeRates::from_rates([("EUR", 1.1)]);
        let eur = rates
            .materialize(&r.currency_by_code("EUR").expect("currency"))
            .expect("materialize");
        let product = vec![UnitTerm::simple(eur), term(&r, "hour", -1.0)];
        let left = [product[0].clone()];
        let right = [term(&r, "hour", 1.0)];
        let (reduced, _) =
            reduce(&r, product.clone(), 12.0, &left, &right, UnitVariant::Us).expect("reduce");
        assert_eq!(reduced, product);
    }

    #[test]
    fn expand_to_base_unwraps_derived_units() {
        let r = registry();
        let (expanded, factor) =
            expand_to_base(&r, &[term(&r, "liter", 1.0)], UnitVariant::Us).expect("expand");
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].unit.id, "meter");
        assert_eq!(expanded[0].exponent, 3.0);
        assert!((factor - 0.001).abs() < 1e-12);
    }
}
