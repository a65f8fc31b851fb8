//! The error type for the evaluation core.
//!
//! Every fallible operation in the crate returns [`ReckonError`], a
//! `kind` plus message pair. The evaluator threads errors with `?`, so
//! the first error produced by an operand wins and the rest of the line
//! is skipped, which is exactly the short-circuit the notebook surfaces
//! to the user.

use std::borrow::Cow;
use std::fmt;

/// `ErrorKind` enumerates the failure classes surfaced to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Operands of an additive or comparison operation have incompatible
    /// dimension signatures.
    DimensionMismatch,
    /// A unit name did not resolve against the registry.
    UnknownUnit,
    /// A currency code or symbol did not resolve.
    UnknownCurrency,
    /// A variable was read before assignment and is not a unit or keyword.
    UnknownVariable,
    /// An unrecognized named constant.
    UnknownConstant,
    /// An unrecognized function name.
    UnknownFunction,
    /// A function was called with the wrong number of arguments.
    ArityMismatch,
    /// A math function was applied outside its domain.
    DomainError,
    /// Division by a zero number or zero duration.
    DivisionByZero,
    /// A digit is not valid for the literal's base.
    InvalidDigitForBase,
    /// A numeric base outside `2..=36`.
    InvalidBase,
    /// A timezone name did not resolve to an IANA zone.
    TimezoneUnknown,
    /// A temporal property was requested from a value that lacks it.
    PropertyNotApplicable,
    /// A conversion target is incompatible with the source value.
    ConversionIncompatible,
    /// A presentation format rejected the value (e.g. `percentage` on a
    /// dimensioned number).
    FormatIncompatible,
    /// A precision format was applied to a non-numeric value.
    PrecisionNotApplicable,
    /// An internal assertion failed; indicates corrupt registry data.
    Assert,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DimensionMismatch => "DimensionMismatch",
            Self::UnknownUnit => "UnknownUnit",
            Self::UnknownCurrency => "UnknownCurrency",
            Self::UnknownVariable => "UnknownVariable",
            Self::UnknownConstant => "UnknownConstant",
            Self::UnknownFunction => "UnknownFunction",
            Self::ArityMismatch => "ArityMismatch",
            Self::DomainError => "DomainError",
            Self::DivisionByZero => "DivisionByZero",
            Self::InvalidDigitForBase => "InvalidDigitForBase",
            Self::InvalidBase => "InvalidBase",
            Self::TimezoneUnknown => "TimezoneUnknown",
            Self::PropertyNotApplicable => "PropertyNotApplicable",
            Self::ConversionIncompatible => "ConversionIncompatible",
            Self::FormatIncompatible => "FormatIncompatible",
            Self::PrecisionNotApplicable => "PrecisionNotApplicable",
            Self::Assert => "Assert",
        };
        f.write_str(s)
    }
}

/// The error type returned by the evaluation core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReckonError {
    kind: ErrorKind,
    message: Cow<'static, str>,
}

impl ReckonError {
    #[inline]
    #[must_use]
    const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: Cow::Borrowed(""),
        }
    }

    /// Creates an error for incompatible dimension signatures.
    #[inline]
    #[must_use]
    pub const fn dimension_mismatch() -> Self {
        Self::new(ErrorKind::DimensionMismatch)
    }

    /// Creates an unknown-unit error.
    #[inline]
    #[must_use]
    pub const fn unknown_unit() -> Self {
        Self::new(ErrorKind::UnknownUnit)
    }

    /// Creates an unknown-currency error.
    #[inline]
    #[must_use]
    pub const fn unknown_currency() -> Self {
        Self::new(ErrorKind::UnknownCurrency)
    }

    /// Creates an unknown-variable error.
    #[inline]
    #[must_use]
    pub const fn unknown_variable() -> Self {
        Self::new(ErrorKind::UnknownVariable)
    }

    /// Creates an unknown-constant error.
    #[inline]
    #[must_use]
    pub const fn unknown_constant() -> Self {
        Self::new(ErrorKind::UnknownConstant)
    }

    /// Creates an unknown-function error.
    #[inline]
    #[must_use]
    pub const fn unknown_function() -> Self {
        Self::new(ErrorKind::UnknownFunction)
    }

    /// Creates an arity-mismatch error.
    #[inline]
    #[must_use]
    pub const fn arity_mismatch() -> Self {
        Self::new(ErrorKind::ArityMismatch)
    }

    /// Creates a domain error.
    #[inline]
    #[must_use]
    pub const fn domain() -> Self {
        Self::new(ErrorKind::DomainError)
    }

    /// Creates a division-by-zero error.
    #[inline]
    #[must_use]
    pub const fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero)
    }

    /// Creates an invalid-digit error.
    #[inline]
    #[must_use]
    pub const fn invalid_digit() -> Self {
        Self::new(ErrorKind::InvalidDigitForBase)
    }

    /// Creates an invalid-base error.
    #[inline]
    #[must_use]
    pub const fn invalid_base() -> Self {
        Self::new(ErrorKind::InvalidBase)
    }

    /// Creates an unknown-timezone error.
    #[inline]
    #[must_use]
    pub const fn timezone_unknown() -> Self {
        Self::new(ErrorKind::TimezoneUnknown)
    }

    /// Creates a property-not-applicable error.
    #[inline]
    #[must_use]
    pub const fn property_not_applicable() -> Self {
        Self::new(ErrorKind::PropertyNotApplicable)
    }

    /// Creates a conversion-incompatible error.
    #[inline]
    #[must_use]
    pub const fn conversion_incompatible() -> Self {
        Self::new(ErrorKind::ConversionIncompatible)
    }

    /// Creates a format-incompatible error.
    #[inline]
    #[must_use]
    pub const fn format_incompatible() -> Self {
        Self::new(ErrorKind::FormatIncompatible)
    }

    /// Creates a precision-not-applicable error.
    #[inline]
    #[must_use]
    pub const fn precision_not_applicable() -> Self {
        Self::new(ErrorKind::PrecisionNotApplicable)
    }

    /// Creates an assertion error for internal invariant violations.
    #[inline]
    #[must_use]
    pub const fn assert() -> Self {
        Self::new(ErrorKind::Assert)
    }

    /// Attaches a message to the error.
    #[must_use]
    pub fn with_message<S>(mut self, message: S) -> Self
    where
        S: Into<Cow<'static, str>>,
    {
        self.message = message.into();
        self
    }

    /// Returns this error's kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Consumes the error, returning its message.
    #[inline]
    #[must_use]
    pub fn into_message(self) -> Cow<'static, str> {
        self.message
    }
}

impl fmt::Display for ReckonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ReckonError {}
