//! The compiled-in default dataset.
//!
//! Loading unit data from files is a host concern; the core ships with a
//! dataset rich enough to evaluate everyday documents and to back the
//! test suite. Registration order matters (see the module docs in
//! [`crate::registry`]): base units lead their dimension so the reducer's
//! factor search and base conversions land on them first, and named
//! derived dimensions are registered most-specific first.

use std::f64::consts::PI;

use super::{Conversion, Currency, CurrencyCode, Dimension, Unit, UnitDisplay, UnitRegistry};

struct UnitRow {
    id: &'static str,
    dimension: &'static str,
    symbol: &'static str,
    singular: &'static str,
    plural: &'static str,
    aliases: &'static [&'static str],
    conversion: Conversion,
    count_as_terms: u8,
}

fn linear(
    id: &'static str,
    dimension: &'static str,
    symbol: &'static str,
    singular: &'static str,
    plural: &'static str,
    aliases: &'static [&'static str],
    factor: f64,
) -> UnitRow {
    UnitRow {
        id,
        dimension,
        symbol,
        singular,
        plural,
        aliases,
        conversion: Conversion::Linear { factor },
        count_as_terms: 1,
    }
}

fn affine(
    id: &'static str,
    dimension: &'static str,
    symbol: &'static str,
    singular: &'static str,
    plural: &'static str,
    aliases: &'static [&'static str],
    factor: f64,
    offset: f64,
) -> UnitRow {
    UnitRow {
        id,
        dimension,
        symbol,
        singular,
        plural,
        aliases,
        conversion: Conversion::Affine { factor, offset },
        count_as_terms: 1,
    }
}

fn variant(
    id: &'static str,
    dimension: &'static str,
    symbol: &'static str,
    singular: &'static str,
    plural: &'static str,
    aliases: &'static [&'static str],
    us: f64,
    uk: f64,
) -> UnitRow {
    UnitRow {
        id,
        dimension,
        symbol,
        singular,
        plural,
        aliases,
        conversion: Conversion::Variant { us, uk },
        count_as_terms: 1,
    }
}

fn spelled(mut row: UnitRow, count_as_terms: u8) -> UnitRow {
    row.count_as_terms = count_as_terms;
    row
}

/// Builds the default registry.
#[must_use]
pub(crate) fn builtin() -> UnitRegistry {
    let mut registry = UnitRegistry::new();

    register_dimensions(&mut registry);
    register_units(&mut registry);
    register_currencies(&mut registry);

    registry
}

fn register_dimensions(registry: &mut UnitRegistry) {
    let base = [
        ("length", "meter"),
        ("mass", "kilogram"),
        ("time", "second"),
        ("temperature", "kelvin"),
        ("angle", "radian"),
        ("data", "byte"),
    ];
    for (id, base_unit) in base {
        registry.register_dimension(Dimension {
            id: id.to_owned(),
            base_unit: base_unit.to_owned(),
            derived_from: Vec::new(),
        });
    }

    let derived: &[(&str, &str, &[(&str, f64)])] = &[
        ("area", "square_meter", &[("length", 2.0)]),
        ("volume", "cubic_meter", &[("length", 3.0)]),
        ("frequency", "hertz", &[("time", -1.0)]),
        ("velocity", "meter_per_second", &[("length", 1.0), ("time", -1.0)]),
        (
            "acceleration",
            "meter_per_second_squared",
            &[("length", 1.0), ("time", -2.0)],
        ),
        (
            "force",
            "newton",
            &[("mass", 1.0), ("length", 1.0), ("time", -2.0)],
        ),
        (
            "energy",
            "joule",
            &[("mass", 1.0), ("length", 2.0), ("time", -2.0)],
        ),
        (
            "power",
            "watt",
            &[("mass", 1.0), ("length", 2.0), ("time", -3.0)],
        ),
        (
            "pressure",
            "pascal",
            &[("mass", 1.0), ("length", -1.0), ("time", -2.0)],
        ),
    ];
    for (id, base_unit, expansion) in derived {
        registry.register_dimension(Dimension {
            id: (*id).to_owned(),
            base_unit: (*base_unit).to_owned(),
            derived_from: expansion
                .iter()
                .map(|(d, e)| ((*d).to_owned(), *e))
                .collect(),
        });
    }
}

#[allow(clippy::approx_constant)]
fn register_units(registry: &mut UnitRegistry) {
    let rows = [
        // length — meter first: it is the base unit of the dimension.
        linear("meter", "length", "m", "meter", "meters", &["metre", "metres"], 1.0),
        linear("decimeter", "length", "dm", "decimeter", "decimeters", &["decimetre", "decimetres"], 0.1),
        linear("centimeter", "length", "cm", "centimeter", "centimeters", &["centimetre", "centimetres"], 0.01),
        linear("millimeter", "length", "mm", "millimeter", "millimeters", &["millimetre", "millimetres"], 0.001),
        linear("micrometer", "length", "µm", "micrometer", "micrometers", &["micron", "microns", "um"], 1e-6),
        linear("kilometer", "length", "km", "kilometer", "kilometers", &["kilometre", "kilometres"], 1000.0),
        linear("inch", "length", "in", "inch", "inches", &[], 0.0254),
        linear("foot", "length", "ft", "foot", "feet", &[], 0.3048),
        linear("yard", "length", "yd", "yard", "yards", &[], 0.9144),
        linear("mile", "length", "mi", "mile", "miles", &[], 1609.344),
        linear("nautical_mile", "length", "nmi", "nautical mile", "nautical miles", &[], 1852.0),
        // mass
        linear("kilogram", "mass", "kg", "kilogram", "kilograms", &[], 1.0),
        linear("gram", "mass", "g", "gram", "grams", &[], 0.001),
        linear("milligram", "mass", "mg", "milligram", "milligrams", &[], 1e-6),
        linear("tonne", "mass", "t", "tonne", "tonnes", &["metric ton", "metric tons"], 1000.0),
        linear("pound", "mass", "lb", "pound", "pounds", &["lbs"], 0.453_592_37),
        linear("ounce", "mass", "oz", "ounce", "ounces", &[], 0.028_349_523_125),
        linear("stone", "mass", "st", "stone", "stones", &[], 6.350_293_18),
        // time — ids double as the canonical duration field names.
        linear("second", "time", "s", "second", "seconds", &["sec", "secs"], 1.0),
        linear("millisecond", "time", "ms", "millisecond", "milliseconds", &[], 0.001),
        linear("minute", "time", "min", "minute", "minutes", &["mins"], 60.0),
        linear("hour", "time", "h", "hour", "hours", &["hr", "hrs"], 3600.0),
        linear("day", "time", "d", "day", "days", &[], 86_400.0),
        linear("week", "time", "wk", "week", "weeks", &[], 604_800.0),
        linear("month", "time", "mo", "month", "months", &[], 2_629_800.0),
        linear("year", "time", "yr", "year", "years", &["yrs"], 31_557_600.0),
        // temperature
        linear("kelvin", "temperature", "K", "kelvin", "kelvins", &[], 1.0),
        affine("celsius", "temperature", "°C", "celsius", "celsius", &["C"], 1.0, -273.15),
        affine("fahrenheit", "temperature", "°F", "fahrenheit", "fahrenheit", &["F"], 5.0 / 9.0, -459.67),
        linear("rankine", "temperature", "°R", "rankine", "rankine", &[], 5.0 / 9.0),
        // angle
        linear("radian", "angle", "rad", "radian", "radians", &[], 1.0),
        linear("degree", "angle", "°", "degree", "degrees", &["deg", "degs"], PI / 180.0),
        linear("arcminute", "angle", "′", "arcminute", "arcminutes", &["arcmin"], PI / 10_800.0),
        linear("arcsecond", "angle", "″", "arcsecond", "arcseconds", &["arcsec"], PI / 648_000.0),
        linear("gradian", "angle", "gon", "gradian", "gradians", &[], PI / 200.0),
        linear("turn", "angle", "tr", "turn", "turns", &[], 2.0 * PI),
        // data
        linear("byte", "data", "B", "byte", "bytes", &[], 1.0),
        linear("bit", "data", "bit", "bit", "bits", &[], 0.125),
        linear("kilobyte", "data", "kB", "kilobyte", "kilobytes", &["KB"], 1e3),
        linear("megabyte", "data", "MB", "megabyte", "megabytes", &[], 1e6),
        linear("gigabyte", "data", "GB", "gigabyte", "gigabytes", &[], 1e9),
        linear("terabyte", "data", "TB", "terabyte", "terabytes", &[], 1e12),
        linear("kibibyte", "data", "KiB", "kibibyte", "kibibytes", &[], 1024.0),
        linear("mebibyte", "data", "MiB", "mebibyte", "mebibytes", &[], 1_048_576.0),
        linear("gibibyte", "data", "GiB", "gibibyte", "gibibytes", &[], 1_073_741_824.0),
        // area
        linear("square_meter", "area", "m²", "square meter", "square meters", &["m2"], 1.0),
        linear("hectare", "area", "ha", "hectare", "hectares", &[], 10_000.0),
        linear("acre", "area", "ac", "acre", "acres", &[], 4_046.856_422_4),
        // volume
        linear("cubic_meter", "volume", "m³", "cubic meter", "cubic meters", &["m3"], 1.0),
        linear("liter", "volume", "L", "liter", "liters", &["litre", "litres", "l"], 0.001),
        linear("milliliter", "volume", "mL", "milliliter", "milliliters", &["millilitre", "millilitres", "ml"], 1e-6),
        variant("gallon", "volume", "gal", "gallon", "gallons", &[], 0.003_785_411_784, 0.004_546_09),
        variant("pint", "volume", "pt", "pint", "pints", &[], 0.000_473_176_473, 0.000_568_261_25),
        variant("fluid_ounce", "volume", "fl oz", "fluid ounce", "fluid ounces", &["floz"], 2.957_352_956_25e-5, 2.841_306_25e-5),
        // frequency
        linear("hertz", "frequency", "Hz", "hertz", "hertz", &[], 1.0),
        linear("kilohertz", "frequency", "kHz", "kilohertz", "kilohertz", &[], 1e3),
        linear("megahertz", "frequency", "MHz", "megahertz", "megahertz", &[], 1e6),
        linear("gigahertz", "frequency", "GHz", "gigahertz", "gigahertz", &[], 1e9),
        // velocity — the spelled-out composites count as two terms, so the
        // reducer never rewrites `km/h` into them.
        spelled(
            linear("meter_per_second", "velocity", "m/s", "meter per second", "meters per second", &["mps"], 1.0),
            2,
        ),
        spelled(
            linear("kilometer_per_hour", "velocity", "km/h", "kilometer per hour", "kilometers per hour", &["kph"], 1.0 / 3.6),
            2,
        ),
        spelled(
            linear("mile_per_hour", "velocity", "mph", "mile per hour", "miles per hour", &[], 0.447_04),
            2,
        ),
        linear("knot", "velocity", "kn", "knot", "knots", &[], 463.0 / 900.0),
        // acceleration
        spelled(
            linear(
                "meter_per_second_squared",
                "acceleration",
                "m/s²",
                "meter per second squared",
                "meters per second squared",
                &["mps2"],
                1.0,
            ),
            2,
        ),
        linear("standard_gravity", "acceleration", "g₀", "standard gravity", "standard gravities", &["gforce"], 9.806_65),
        // force
        linear("newton", "force", "N", "newton", "newtons", &[], 1.0),
        linear("kilonewton", "force", "kN", "kilonewton", "kilonewtons", &[], 1000.0),
        linear("pound_force", "force", "lbf", "pound of force", "pounds of force", &[], 4.448_221_615_260_5),
        // energy
        linear("joule", "energy", "J", "joule", "joules", &[], 1.0),
        linear("kilojoule", "energy", "kJ", "kilojoule", "kilojoules", &[], 1000.0),
        linear("calorie", "energy", "cal", "calorie", "calories", &[], 4.184),
        linear("kilocalorie", "energy", "kcal", "kilocalorie", "kilocalories", &["Cal"], 4184.0),
        linear("watt_hour", "energy", "Wh", "watt hour", "watt hours", &[], 3600.0),
        linear("kilowatt_hour", "energy", "kWh", "kilowatt hour", "kilowatt hours", &[], 3.6e6),
        linear("british_thermal_unit", "energy", "BTU", "british thermal unit", "british thermal units", &["btu"], 1_055.055_852_62),
        // power
        linear("watt", "power", "W", "watt", "watts", &[], 1.0),
        linear("kilowatt", "power", "kW", "kilowatt", "kilowatts", &[], 1000.0),
        linear("megawatt", "power", "MW", "megawatt", "megawatts", &[], 1e6),
        linear("horsepower", "power", "hp", "horsepower", "horsepower", &[], 745.699_871_582_270_22),
        // pressure
        linear("pascal", "pressure", "Pa", "pascal", "pascals", &[], 1.0),
        linear("kilopascal", "pressure", "kPa", "kilopascal", "kilopascals", &[], 1000.0),
        linear("bar", "pressure", "bar", "bar", "bars", &[], 100_000.0),
        linear("atmosphere", "pressure", "atm", "atmosphere", "atmospheres", &[], 101_325.0),
        linear("psi", "pressure", "psi", "pound per square inch", "pounds per square inch", &[], 6_894.757_293_168_361),
        linear("millimeter_of_mercury", "pressure", "mmHg", "millimeter of mercury", "millimeters of mercury", &[], 133.322_387_415),
    ];

    for row in rows {
        registry.register_unit(Unit {
            id: row.id.to_owned(),
            dimension: row.dimension.to_owned(),
            names: row.aliases.iter().map(|s| (*s).to_owned()).collect(),
            display: UnitDisplay::new(row.symbol, row.singular, row.plural),
            conversion: row.conversion,
            count_as_terms: row.count_as_terms,
        });
    }
}

fn register_currencies(registry: &mut UnitRegistry) {
    // `$`, `£`, and `¥` each name several currencies; they resolve to
    // sentinel dimensions instead of any one of them.
    for symbol in ["$", "£", "¥"] {
        registry.register_ambiguous_symbol(symbol);
    }

    let rows: &[(&str, &str, bool, &[&str])] = &[
        ("USD", "$", false, &["dollar", "dollars"]),
        ("EUR", "€", false, &["euro", "euros"]),
        ("GBP", "£", false, &["pound sterling", "pounds sterling"]),
        ("JPY", "¥", false, &["yen"]),
        ("CHF", "Fr", true, &["franc", "francs"]),
        ("CAD", "$", false, &[]),
        ("AUD", "$", false, &[]),
        ("CNY", "¥", false, &["yuan", "renminbi"]),
        ("INR", "₹", false, &["rupee", "rupees"]),
        ("SEK", "kr", true, &["krona", "kronor"]),
        ("NOK", "kr", true, &["krone", "kroner"]),
        ("KRW", "₩", false, &["won"]),
    ];

    for (code, symbol, spaced, names) in rows {
        let Ok(code) = CurrencyCode::try_from_str(code) else {
            debug_assert!(false, "builtin currency code must be three ASCII letters");
            continue;
        };
        registry.register_currency(Currency {
            code,
            names: names.iter().map(|s| (*s).to_owned()).collect(),
            symbol: (*symbol).to_owned(),
            spaced: *spaced,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_units_lead_their_dimensions() {
        let registry = builtin();
        for dim in ["length", "mass", "time", "temperature", "angle", "data"] {
            let dimension = registry.dimension_by_id(dim).expect("base dimension");
            let units = registry.units_by_dimension(dim);
            assert_eq!(units[0].id, dimension.base_unit, "dimension {dim}");
        }
    }

    #[test]
    fn derived_base_units_have_unit_factor() {
        let registry = builtin();
        for dim in ["velocity", "acceleration", "force", "energy", "power", "pressure"] {
            let dimension = registry.dimension_by_id(dim).expect("derived dimension");
            let base = registry.unit_by_id(&dimension.base_unit).expect("base unit");
            assert!(
                (base.factor(crate::UnitVariant::Us) - 1.0).abs() < f64::EPSILON,
                "dimension {dim}"
            );
        }
    }

    #[test]
    fn duration_field_units_are_present() {
        let registry = builtin();
        for id in ["year", "month", "week", "day", "hour", "minute", "second", "millisecond"] {
            assert!(registry.unit_by_id(id).is_some(), "unit {id}");
        }
    }
}
