//! `reckon_rs` is the evaluation core of a notebook-style calculator.
//!
//! A host feeds the evaluator one parsed line at a time; every line
//! produces a typed [`Value`]: a dimensionless or unit-carrying number, a
//! multi-component measurement such as `5 ft 7 in`, a date, a time, an
//! instant, a zoned datetime, a duration, a boolean, or a presentation
//! wrapper the formatter unwraps for display.
//!
//! The crate owns the hard parts of that pipeline:
//!
//! - the value algebra and the unit/dimension engine, including automatic
//!   simplification of composed unit terms and reduction to named derived
//!   dimensions (`5 kg × 9.8 m/s² = 49 N`),
//! - calendar-aware date and duration arithmetic across six temporal
//!   kinds,
//! - the conversion subsystem that drives unit conversion, presentation
//!   formatting, property extraction, and timezone retargeting.
//!
//! Parsing source text into the [`ast`] and formatting the resulting
//! values back to strings are host concerns; both sides of the boundary
//! are plain data types.
#![cfg_attr(not(test), forbid(clippy::unwrap_used))]
#![allow(
    clippy::module_name_repetitions,
    clippy::redundant_pub_crate,
    clippy::too_many_lines,
    clippy::cognitive_complexity,
    clippy::missing_errors_doc,
    clippy::option_if_let_else,

    // The numeric substrate is f64 end to end; truncating casts are
    // confined to digit and date-field handling where the range is checked.
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]

pub mod ast;
pub mod error;
pub mod host;
pub mod options;
pub mod registry;

pub(crate) mod arithmetic;
pub(crate) mod compare;
pub(crate) mod conversion;
pub(crate) mod dimension;
pub(crate) mod functions;
pub(crate) mod rounding;
pub(crate) mod sys;
pub(crate) mod temporal;
pub(crate) mod terms;

pub mod eval;
pub mod values;

#[doc(inline)]
pub use error::{ErrorKind, ReckonError};

#[doc(inline)]
pub use options::{AngleUnit, EvaluatorConfig, UnitVariant};

#[doc(inline)]
pub use registry::{Currency, Dimension, ExchangeRates, Unit, UnitRegistry};

#[doc(inline)]
pub use values::{CalendarDuration, CompositeValue, Instant, Numeric, Precision, UnitTerm, Value};

#[doc(inline)]
pub use eval::{Environment, Evaluator};

pub use sys::SysHooks;

/// The `reckon_rs` result type.
pub type ReckonResult<T> = Result<T, ReckonError>;

/// A library specific trait for unwrapping assertions.
///
/// Registry data is compiled in and immutable; a lookup that comes back
/// empty for a non-special dimension id indicates a corrupt registry, not
/// a user error. This panics in debug builds and surfaces an assertion
/// error at runtime.
pub(crate) trait ReckonUnwrap {
    type Output;

    fn reckon_unwrap(self) -> ReckonResult<Self::Output>;
}

impl<T> ReckonUnwrap for Option<T> {
    type Output = T;

    fn reckon_unwrap(self) -> ReckonResult<Self::Output> {
        debug_assert!(self.is_some());
        self.ok_or(ReckonError::assert())
    }
}
