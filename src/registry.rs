//! The unit, dimension, and currency registry.
//!
//! The registry is the data backbone of the evaluator: every unit name in
//! a document resolves here, and the dimension records drive signature
//! expansion and named-dimension reduction. It is constructed once (from
//! the compiled-in dataset plus any host additions), then shared
//! read-only for the lifetime of the evaluator.
//!
//! Registration order is meaningful and deterministic: `units_by_dimension`
//! returns units in registration order (the term-reduction factor search
//! walks that order), and `dimension_by_signature` scans dimensions in
//! registration order, so named-dimension matches are reproducible.

use std::str::FromStr;
use std::sync::Arc;

use chrono_tz::Tz;
use rustc_hash::FxHashMap;
use tinystr::TinyAsciiStr;

use crate::dimension::{self, Signature};
use crate::options::UnitVariant;
use crate::{ReckonError, ReckonResult};

pub(crate) mod currency;
pub(crate) mod data;

pub use currency::ExchangeRates;

/// A compact ISO 4217 currency code.
pub type CurrencyCode = TinyAsciiStr<3>;

// ==== Unit records ====

/// Display metadata for a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDisplay {
    /// Short symbol, e.g. `m` or `°C`.
    pub symbol: String,
    /// Singular written form, e.g. `meter`.
    pub singular: String,
    /// Plural written form, e.g. `meters`.
    pub plural: String,
}

impl UnitDisplay {
    #[must_use]
    pub fn new(symbol: &str, singular: &str, plural: &str) -> Self {
        Self {
            symbol: symbol.to_owned(),
            singular: singular.to_owned(),
            plural: plural.to_owned(),
        }
    }
}

/// How a unit converts to the base expansion of its dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// `base = value × factor`.
    Linear {
        /// Multiplier into the dimension's base expansion.
        factor: f64,
    },
    /// `base = (value − offset) × factor`; covers °C/°F.
    Affine {
        /// Multiplier into the dimension's base expansion.
        factor: f64,
        /// Zero point expressed in this unit.
        offset: f64,
    },
    /// A linear conversion whose factor depends on the regional variant.
    Variant {
        /// United States factor.
        us: f64,
        /// United Kingdom factor.
        uk: f64,
    },
}

impl Conversion {
    /// The multiplicative factor under the given variant.
    #[inline]
    #[must_use]
    pub fn factor(&self, variant: UnitVariant) -> f64 {
        match *self {
            Self::Linear { factor } | Self::Affine { factor, .. } => factor,
            Self::Variant { us, uk } => match variant {
                UnitVariant::Us => us,
                UnitVariant::Uk => uk,
            },
        }
    }

    /// The affine offset, zero for linear and variant conversions.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> f64 {
        match *self {
            Self::Affine { offset, .. } => offset,
            _ => 0.0,
        }
    }
}

/// A single unit of measure.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// Stable identifier, unique within the registry.
    pub id: String,
    /// The id of the dimension this unit measures.
    pub dimension: String,
    /// Alias spellings accepted on input.
    pub names: Vec<String>,
    /// Display metadata.
    pub display: UnitDisplay,
    /// Conversion to the dimension's base expansion.
    pub conversion: Conversion,
    /// How many terms this unit counts as when the reducer weighs it
    /// against a multi-term spelling. `m/s` counts as two; `N` as one.
    pub count_as_terms: u8,
}

impl Unit {
    /// The conversion factor under the given variant.
    #[inline]
    #[must_use]
    pub fn factor(&self, variant: UnitVariant) -> f64 {
        self.conversion.factor(variant)
    }

    /// Converts a value in this unit into the dimension's base expansion.
    #[inline]
    #[must_use]
    pub fn to_base(&self, value: f64, variant: UnitVariant) -> f64 {
        (value - self.conversion.offset()) * self.conversion.factor(variant)
    }

    /// Converts a value in the dimension's base expansion into this unit.
    #[inline]
    #[must_use]
    pub fn from_base(&self, value: f64, variant: UnitVariant) -> f64 {
        value / self.conversion.factor(variant) + self.conversion.offset()
    }

    /// Returns true if the unit belongs to a special (non-expanding)
    /// dimension: currency, a currency-symbol sentinel, or user-defined.
    #[inline]
    #[must_use]
    pub fn is_special(&self) -> bool {
        dimension::is_special_dimension(&self.dimension)
    }
}

// ==== Dimension records ====

/// A base or named derived dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    /// Stable identifier, e.g. `length` or `force`.
    pub id: String,
    /// The id of this dimension's base unit.
    pub base_unit: String,
    /// For a derived dimension, its expansion as `(dimension, exponent)`
    /// pairs. Empty for base dimensions.
    pub derived_from: Vec<(String, f64)>,
}

impl Dimension {
    /// Returns true for base dimensions.
    #[inline]
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.derived_from.is_empty()
    }
}

// ==== Currency records ====

/// An ISO 4217 currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    /// ISO code, e.g. `USD`.
    pub code: CurrencyCode,
    /// Alias spellings accepted on input.
    pub names: Vec<String>,
    /// Display symbol, e.g. `€`.
    pub symbol: String,
    /// Whether the symbol is written with a space (`12 kr`) rather than
    /// adjacent (`€12`).
    pub spaced: bool,
}

// ==== Registry ====

/// The read-only unit/dimension/currency registry.
#[derive(Debug, Default)]
pub struct UnitRegistry {
    units: Vec<Arc<Unit>>,
    dimensions: Vec<Arc<Dimension>>,
    currencies: Vec<Arc<Currency>>,

    unit_by_id: FxHashMap<String, usize>,
    unit_by_name: FxHashMap<String, usize>,
    unit_by_name_lower: FxHashMap<String, usize>,
    dimension_by_id: FxHashMap<String, usize>,
    units_of_dimension: FxHashMap<String, Vec<usize>>,

    currency_by_code: FxHashMap<CurrencyCode, usize>,
    currency_symbol_adjacent: FxHashMap<String, usize>,
    currency_symbol_spaced: FxHashMap<String, usize>,
    ambiguous_symbols: Vec<String>,
}

impl UnitRegistry {
    /// Creates an empty registry; see [`UnitRegistry::builtin`] for the
    /// compiled-in dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled-in default dataset: SI and customary units, named
    /// derived dimensions, and common currencies.
    #[must_use]
    pub fn builtin() -> Self {
        data::builtin()
    }

    // ==== Registration ====

    /// Registers a dimension. Later lookups preserve registration order.
    pub fn register_dimension(&mut self, dimension: Dimension) {
        let index = self.dimensions.len();
        self.dimension_by_id.insert(dimension.id.clone(), index);
        self.dimensions.push(Arc::new(dimension));
    }

    /// Registers a unit and indexes its id, names, and display forms.
    pub fn register_unit(&mut self, unit: Unit) {
        let index = self.units.len();
        self.unit_by_id.insert(unit.id.clone(), index);
        self.units_of_dimension
            .entry(unit.dimension.clone())
            .or_default()
            .push(index);

        let mut spellings: Vec<&str> = vec![
            unit.id.as_str(),
            unit.display.symbol.as_str(),
            unit.display.singular.as_str(),
            unit.display.plural.as_str(),
        ];
        spellings.extend(unit.names.iter().map(String::as_str));
        for spelling in spellings {
            if spelling.is_empty() {
                continue;
            }
            self.unit_by_name
                .entry(spelling.to_owned())
                .or_insert(index);
            self.unit_by_name_lower
                .entry(spelling.to_ascii_lowercase())
                .or_insert(index);
        }

        self.units.push(Arc::new(unit));
    }

    /// Registers a user-defined unit under its own sentinel dimension, so
    /// it participates in compatibility checks but never expands.
    pub fn register_user_unit(&mut self, id: &str, display: UnitDisplay) {
        let dimension = format!("user_defined_{id}");
        self.register_unit(Unit {
            id: id.to_owned(),
            dimension,
            names: Vec::new(),
            display,
            conversion: Conversion::Linear { factor: 1.0 },
            count_as_terms: 1,
        });
    }

    /// Registers a currency.
    pub fn register_currency(&mut self, currency: Currency) {
        let index = self.currencies.len();
        self.currency_by_code.insert(currency.code, index);
        if !currency.symbol.is_empty() && !self.ambiguous_symbols.contains(&currency.symbol) {
            if currency.spaced {
                self.currency_symbol_spaced
                    .entry(currency.symbol.clone())
                    .or_insert(index);
            } else {
                self.currency_symbol_adjacent
                    .entry(currency.symbol.clone())
                    .or_insert(index);
            }
        }
        self.currencies.push(Arc::new(currency));
    }

    /// Marks a currency symbol (e.g. `$`) as ambiguous. Ambiguous symbols
    /// resolve to sentinel units rather than concrete currencies.
    pub fn register_ambiguous_symbol(&mut self, symbol: &str) {
        if !self.ambiguous_symbols.iter().any(|s| s == symbol) {
            self.ambiguous_symbols.push(symbol.to_owned());
        }
    }

    // ==== Unit lookup ====

    /// Looks a unit up by its stable id.
    #[must_use]
    pub fn unit_by_id(&self, id: &str) -> Option<Arc<Unit>> {
        self.unit_by_id.get(id).map(|&i| self.units[i].clone())
    }

    /// Case-sensitive lookup across ids, aliases, and display forms.
    #[must_use]
    pub fn unit_by_name(&self, name: &str) -> Option<Arc<Unit>> {
        self.unit_by_name.get(name).map(|&i| self.units[i].clone())
    }

    /// Case-insensitive fallback lookup for names that miss the
    /// case-sensitive index.
    #[must_use]
    pub fn unit_by_name_fallback(&self, name: &str) -> Option<Arc<Unit>> {
        self.unit_by_name_lower
            .get(&name.to_ascii_lowercase())
            .map(|&i| self.units[i].clone())
    }

    /// All units of a dimension, in registration order.
    #[must_use]
    pub fn units_by_dimension(&self, dimension: &str) -> Vec<Arc<Unit>> {
        self.units_of_dimension
            .get(dimension)
            .map(|indices| indices.iter().map(|&i| self.units[i].clone()).collect())
            .unwrap_or_default()
    }

    // ==== Dimension lookup ====

    /// Looks a dimension up by id.
    #[must_use]
    pub fn dimension_by_id(&self, id: &str) -> Option<Arc<Dimension>> {
        self.dimension_by_id
            .get(id)
            .map(|&i| self.dimensions[i].clone())
    }

    /// Finds the first named derived dimension whose base expansion equals
    /// `signature`, in registration order.
    #[must_use]
    pub(crate) fn dimension_by_signature(&self, signature: &Signature) -> Option<Arc<Dimension>> {
        self.dimensions
            .iter()
            .filter(|d| !d.is_base())
            .find(|d| {
                dimension::dimension_signature(self, &d.id)
                    .map(|s| &s == signature)
                    .unwrap_or(false)
            })
            .cloned()
    }

    // ==== Currency lookup ====

    /// Looks a currency up by ISO code (case-insensitive).
    #[must_use]
    pub fn currency_by_code(&self, code: &str) -> Option<Arc<Currency>> {
        let code = CurrencyCode::try_from_str(&code.to_ascii_uppercase()).ok()?;
        self.currency_by_code
            .get(&code)
            .map(|&i| self.currencies[i].clone())
    }

    /// Resolves an adjacent-written currency symbol (`€12`).
    #[must_use]
    pub fn currency_by_symbol_adjacent(&self, symbol: &str) -> Option<Arc<Currency>> {
        self.currency_symbol_adjacent
            .get(symbol)
            .map(|&i| self.currencies[i].clone())
    }

    /// Resolves a space-written currency symbol (`12 kr`).
    #[must_use]
    pub fn currency_by_symbol_spaced(&self, symbol: &str) -> Option<Arc<Currency>> {
        self.currency_symbol_spaced
            .get(symbol)
            .map(|&i| self.currencies[i].clone())
    }

    /// Returns true if `symbol` is registered as ambiguous (`$`, `£`, `¥`).
    #[must_use]
    pub fn is_ambiguous_symbol(&self, symbol: &str) -> bool {
        self.ambiguous_symbols.iter().any(|s| s == symbol)
    }

    /// Materializes the sentinel unit for an ambiguous currency symbol.
    ///
    /// The sentinel carries its own `currency_symbol_*` dimension, so two
    /// `$` amounts combine while `$` and a resolved currency do not.
    pub fn ambiguous_currency_by_symbol(&self, symbol: &str) -> ReckonResult<Arc<Unit>> {
        if !self.is_ambiguous_symbol(symbol) {
            return Err(ReckonError::unknown_currency()
                .with_message(format!("'{symbol}' is not a known currency symbol")));
        }
        Ok(Arc::new(Unit {
            id: symbol.to_owned(),
            dimension: format!("currency_symbol_{symbol}"),
            names: Vec::new(),
            display: UnitDisplay::new(symbol, symbol, symbol),
            conversion: Conversion::Linear { factor: 1.0 },
            count_as_terms: 1,
        }))
    }

    // ==== Timezone lookup ====

    /// Resolves a timezone name against the IANA database, tolerating
    /// case differences and spaces in place of underscores.
    pub fn timezone_resolve(&self, name: &str) -> ReckonResult<Tz> {
        let trimmed = name.trim();
        if let Ok(tz) = Tz::from_str(trimmed) {
            return Ok(tz);
        }
        let normalized = trimmed.replace(' ', "_");
        if let Ok(tz) = Tz::from_str(&normalized) {
            return Ok(tz);
        }
        chrono_tz::TZ_VARIANTS
            .iter()
            .find(|tz| tz.name().eq_ignore_ascii_case(&normalized))
            .copied()
            .ok_or_else(|| {
                ReckonError::timezone_unknown()
                    .with_message(format!("'{name}' is not a known timezone"))
            })
    }
}
