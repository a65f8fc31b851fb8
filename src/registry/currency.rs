//! Exchange rates and currency-unit materialization.
//!
//! Currencies live in the registry as display records only; arithmetic
//! needs a conversion factor, which depends on the rate table the host
//! loaded. Materialization joins the two: a `Currency` plus a rate
//! becomes an ordinary linear [`Unit`] on the shared `currency`
//! dimension, with USD as the base expansion.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{Conversion, Currency, CurrencyCode, Unit, UnitDisplay};
use crate::{ReckonError, ReckonResult};

/// The dimension id shared by all resolved currencies.
pub(crate) const CURRENCY_DIMENSION: &str = "currency";

/// A read-only table of exchange rates, expressed as USD per one unit of
/// the keyed currency.
#[derive(Debug, Clone, Default)]
pub struct ExchangeRates {
    rates: FxHashMap<CurrencyCode, f64>,
}

impl ExchangeRates {
    /// Creates an empty table; only USD amounts will evaluate.
    #[must_use]
    pub fn new() -> Self {
        let mut rates = FxHashMap::default();
        if let Ok(usd) = CurrencyCode::try_from_str("USD") {
            rates.insert(usd, 1.0);
        }
        Self { rates }
    }

    /// Builds a table from `(code, usd_per_unit)` pairs. Codes that fail
    /// ISO 4217 shape validation are skipped with a warning.
    #[must_use]
    pub fn from_rates<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut table = Self::new();
        for (code, rate) in pairs {
            match CurrencyCode::try_from_str(&code.to_ascii_uppercase()) {
                Ok(code) => {
                    table.rates.insert(code, rate);
                }
                Err(_) => log::warn!("skipping malformed currency code {code:?}"),
            }
        }
        table
    }

    /// The USD rate for a currency, if loaded.
    #[must_use]
    pub fn rate(&self, code: &str) -> Option<f64> {
        let code = CurrencyCode::try_from_str(&code.to_ascii_uppercase()).ok()?;
        self.rates.get(&code).copied()
    }

    /// Converts an amount between two currencies through USD.
    pub fn convert(&self, amount: f64, source: &str, target: &str) -> ReckonResult<f64> {
        let source_rate = self.rate(source).ok_or_else(|| missing_rate(source))?;
        let target_rate = self.rate(target).ok_or_else(|| missing_rate(target))?;
        Ok(amount * source_rate / target_rate)
    }

    /// Materializes a currency as a unit on the shared `currency`
    /// dimension, with the current exchange rate as its linear factor.
    pub fn materialize(&self, currency: &Currency) -> ReckonResult<Arc<Unit>> {
        let code = currency.code.as_str();
        let rate = self.rate(code).ok_or_else(|| missing_rate(code))?;
        Ok(Arc::new(Unit {
            id: code.to_owned(),
            dimension: CURRENCY_DIMENSION.to_owned(),
            names: currency.names.clone(),
            display: UnitDisplay::new(&currency.symbol, code, code),
            conversion: Conversion::Linear { factor: rate },
            count_as_terms: 1,
        }))
    }
}

fn missing_rate(code: &str) -> ReckonError {
    ReckonError::unknown_currency().with_message(format!("no exchange rate loaded for {code}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> ExchangeRates {
        ExchangeRates::from_rates([("EUR", 1.1), ("GBP", 1.25), ("JPY", 0.0065)])
    }

    #[test]
    fn converts_through_usd() {
        let rates = rates();
        let usd = rates.convert(50.0, "EUR", "USD").expect("rate");
        assert!((usd - 55.0).abs() < 1e-9);
        let gbp = rates.convert(100.0, "USD", "GBP").expect("rate");
        assert!((gbp - 80.0).abs() < 1e-9);
    }

    #[test]
    fn missing_rates_error() {
        let err = rates().convert(1.0, "USD", "CLP").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnknownCurrency);
    }

    #[test]
    fn materialized_units_share_the_currency_dimension() {
        let registry = crate::UnitRegistry::builtin();
        let rates = rates();
        let eur = registry.currency_by_code("eur").expect("currency");
        let unit = rates.materialize(&eur).expect("materialize");
        assert_eq!(unit.dimension, CURRENCY_DIMENSION);
        assert!((unit.factor(crate::UnitVariant::Us) - 1.1).abs() < 1e-12);
    }
}
