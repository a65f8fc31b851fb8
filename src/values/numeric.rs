//! Numbers with optional unit terms and display precision.

use std::sync::Arc;

use crate::registry::Unit;
use crate::terms::UnitTerm;

/// How a precision count is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecisionMode {
    /// Digits after the decimal point.
    Decimals,
    /// Significant figures.
    SigFigs,
}

/// A display precision applied by a `decimals N` / `N sig figs` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    /// Digit count.
    pub count: u8,
    /// Interpretation of the count.
    pub mode: PrecisionMode,
}

/// A number with its unit terms.
///
/// An empty term list is dimensionless; a single exponent-1 term is
/// "simple"; anything else is "derived" (`m/s²`, `m²`). The term list is
/// canonical: no unit id appears twice and no exponent is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Numeric {
    /// The scalar, expressed in this value's own units.
    pub value: f64,
    /// The ordered unit terms.
    pub terms: Vec<UnitTerm>,
    /// Display precision, set by precision conversion targets.
    pub precision: Option<Precision>,
}

impl Numeric {
    /// Creates a dimensionless number.
    #[inline]
    #[must_use]
    pub fn num(value: f64) -> Self {
        Self {
            value,
            terms: Vec::new(),
            precision: None,
        }
    }

    /// Creates a simple (single unit, exponent 1) number.
    #[inline]
    #[must_use]
    pub fn num_unit(value: f64, unit: Arc<Unit>) -> Self {
        Self {
            value,
            terms: vec![UnitTerm::simple(unit)],
            precision: None,
        }
    }

    /// Creates a number with an arbitrary term list.
    #[inline]
    #[must_use]
    pub fn num_terms(value: f64, terms: Vec<UnitTerm>) -> Self {
        Self {
            value,
            terms,
            precision: None,
        }
    }

    /// Replaces the scalar, keeping terms and precision.
    #[inline]
    #[must_use]
    pub fn with_value(&self, value: f64) -> Self {
        Self {
            value,
            terms: self.terms.clone(),
            precision: self.precision,
        }
    }

    /// Returns true if the term list is empty.
    #[inline]
    #[must_use]
    pub fn is_dimensionless(&self) -> bool {
        self.terms.is_empty()
    }

    /// Returns true for exactly one term at exponent 1.
    #[inline]
    #[must_use]
    pub fn is_simple(&self) -> bool {
        self.terms.len() == 1 && self.terms[0].exponent == 1.0
    }

    /// Returns true for any non-empty term list that is not simple.
    #[inline]
    #[must_use]
    pub fn is_derived(&self) -> bool {
        !self.is_dimensionless() && !self.is_simple()
    }

    /// The unit, iff this value is simple.
    #[inline]
    #[must_use]
    pub fn simple_unit(&self) -> Option<&Arc<Unit>> {
        if self.is_simple() {
            Some(&self.terms[0].unit)
        } else {
            None
        }
    }

    /// Returns true if the scalar has no fractional part.
    #[inline]
    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.value.is_finite() && self.value.fract() == 0.0
    }
}
