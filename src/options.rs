//! Evaluator settings.
//!
//! Hosts expose a small number of user-facing settings that change how the
//! core evaluates: which regional variant of a unit a bare name refers to,
//! and how bare numbers are interpreted by the trigonometric functions.
//! Settings parse from their user-visible spellings via `FromStr`.

use core::fmt;
use core::str::FromStr;

// ==== Unit variant option ====

/// Selects between regional conversion tables for variant-keyed units
/// such as `gallon` and `pint`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnitVariant {
    /// United States customary measures.
    #[default]
    Us,
    /// British imperial measures.
    Uk,
}

/// A parsing error for [`UnitVariant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseUnitVariantError;

impl fmt::Display for ParseUnitVariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("provided string was not a valid unit variant")
    }
}

impl FromStr for UnitVariant {
    type Err = ParseUnitVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "us" | "US" => Ok(Self::Us),
            "uk" | "UK" => Ok(Self::Uk),
            _ => Err(ParseUnitVariantError),
        }
    }
}

impl fmt::Display for UnitVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Us => f.write_str("us"),
            Self::Uk => f.write_str("uk"),
        }
    }
}

// ==== Angle unit option ====

/// The interpretation of bare numbers passed to trigonometric functions,
/// and the unit of inverse-trigonometric results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AngleUnit {
    /// Degrees.
    #[default]
    Degree,
    /// Radians.
    Radian,
}

/// A parsing error for [`AngleUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseAngleUnitError;

impl fmt::Display for ParseAngleUnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("provided string was not a valid angle unit")
    }
}

impl FromStr for AngleUnit {
    type Err = ParseAngleUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "degree" | "degrees" | "deg" => Ok(Self::Degree),
            "radian" | "radians" | "rad" => Ok(Self::Radian),
            _ => Err(ParseAngleUnitError),
        }
    }
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Degree => f.write_str("degree"),
            Self::Radian => f.write_str("radian"),
        }
    }
}

// ==== Evaluator configuration ====

/// The full set of evaluator settings.
///
/// The configuration is owned by the evaluator and read throughout one
/// document; hosts that let the user flip a setting mid-document create a
/// fresh evaluator with the updated configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluatorConfig {
    /// Regional variant for variant-keyed unit conversions.
    pub variant: UnitVariant,
    /// Angle interpretation for trigonometric functions.
    pub angle_unit: AngleUnit,
}

impl EvaluatorConfig {
    /// Creates a configuration with the provided settings.
    #[inline]
    #[must_use]
    pub const fn new(variant: UnitVariant, angle_unit: AngleUnit) -> Self {
        Self {
            variant,
            angle_unit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_round_trips_through_strings() {
        for v in [UnitVariant::Us, UnitVariant::Uk] {
            assert_eq!(v.to_string().parse::<UnitVariant>(), Ok(v));
        }
        assert!("metric".parse::<UnitVariant>().is_err());
    }

    #[test]
    fn angle_unit_accepts_short_forms() {
        assert_eq!("deg".parse::<AngleUnit>(), Ok(AngleUnit::Degree));
        assert_eq!("radians".parse::<AngleUnit>(), Ok(AngleUnit::Radian));
        assert!("gradian".parse::<AngleUnit>().is_err());
    }
}
