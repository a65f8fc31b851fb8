//! The expression dispatcher.
//!
//! [`Evaluator`] walks the parser's AST one line at a time against an
//! [`Environment`]. Every node kind has exactly one handler; operators
//! and conversions delegate to the engines. A line is atomic: the
//! handler works on a scratch copy of the environment and commits it
//! only when the whole line succeeded, so a failed line never leaks a
//! partial assignment.

use std::f64::consts::{E, PI, TAU};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use rustc_hash::FxHashMap;

use crate::arithmetic;
use crate::ast::{
    AstNode, CompositePart, ExprKind, NumberKind, NumberLiteral, PostfixOp, UnitExprNode,
    UnitTermNode,
};
use crate::compare;
use crate::conversion;
use crate::functions;
use crate::host::HostHooks;
use crate::options::EvaluatorConfig;
use crate::registry::{ExchangeRates, Unit, UnitRegistry};
use crate::sys::SysHooks;
use crate::temporal::{self, TemporalEngine};
use crate::terms::UnitTerm;
use crate::values::{CompositeComponent, CompositeValue, Instant, Numeric, Value};
use crate::{ReckonError, ReckonResult};

const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

/// The per-document variable context: a stack of scopes with last-wins
/// lookup. Assignment writes the innermost scope.
#[derive(Debug, Clone)]
pub struct Environment {
    frames: Vec<FxHashMap<String, Value>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Creates an environment with a single root scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            frames: vec![FxHashMap::default()],
        }
    }

    /// Opens a child scope.
    pub fn push_scope(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    /// Closes the innermost scope; the root scope stays.
    pub fn pop_scope(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Chained variable lookup, innermost scope first.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Binds a variable in the innermost scope, shadowing outer ones.
    pub fn assign(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_owned(), value);
        }
    }
}

/// The evaluation core, bound to a registry, a rate table, settings, and
/// host hooks.
pub struct Evaluator {
    pub(crate) registry: Arc<UnitRegistry>,
    pub(crate) rates: Arc<ExchangeRates>,
    pub(crate) config: EvaluatorConfig,
    hooks: Box<dyn HostHooks>,
}

impl Evaluator {
    /// Creates an evaluator.
    #[must_use]
    pub fn new(
        registry: Arc<UnitRegistry>,
        rates: Arc<ExchangeRates>,
        config: EvaluatorConfig,
        hooks: Box<dyn HostHooks>,
    ) -> Self {
        Self {
            registry,
            rates,
            config,
            hooks,
        }
    }

    /// An evaluator over the compiled-in dataset, the system clock, and
    /// default settings. Only USD currency amounts evaluate until the
    /// host loads a rate table.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(UnitRegistry::builtin()),
            Arc::new(ExchangeRates::new()),
            EvaluatorConfig::default(),
            Box::new(SysHooks),
        )
    }

    /// The registry this evaluator resolves units against.
    #[must_use]
    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    pub(crate) fn temporal(&self) -> TemporalEngine<'_> {
        TemporalEngine::new(self.hooks.as_ref())
    }

    /// Evaluates one line, committing a successful assignment to the
    /// environment. On error the environment is untouched.
    pub fn evaluate(&self, node: &AstNode, env: &mut Environment) -> ReckonResult<Value> {
        let mut working = env.clone();
        let value = self.eval(node, &mut working)?;
        *env = working;
        Ok(value)
    }

    /// Evaluates one line against a scratch copy of the environment,
    /// returning the value and the would-be assignment without mutating
    /// anything. Interactive hosts preview lines this way.
    pub fn evaluate_trial(
        &self,
        node: &AstNode,
        env: &Environment,
    ) -> ReckonResult<(Value, Option<(String, Value)>)> {
        let mut working = env.clone();
        let value = self.eval(node, &mut working)?;
        let binding = match &node.kind {
            ExprKind::VariableAssignment { name, .. } => Some((name.clone(), value.clone())),
            _ => None,
        };
        Ok((value, binding))
    }

    fn eval(&self, node: &AstNode, env: &mut Environment) -> ReckonResult<Value> {
        match &node.kind {
            ExprKind::VariableAssignment { name, value } => {
                let value = self.eval(value, env)?;
                env.assign(name, value.clone());
                Ok(value)
            }
            ExprKind::ConditionalExpr {
                condition,
                then_branch,
                else_branch,
            } => {
                let predicate = self.eval(condition, env)?;
                // Exactly one branch evaluates.
                if compare::truthiness(&predicate)? {
                    self.eval(then_branch, env)
                } else {
                    self.eval(else_branch, env)
                }
            }
            ExprKind::Conversion { value, target } => {
                let value = self.eval(value, env)?;
                conversion::convert(self, value, target)
            }
            ExprKind::BinaryExpression {
                operator,
                left,
                right,
            } => {
                let lhs = self.eval(left, env)?;
                let rhs = self.eval(right, env)?;
                arithmetic::binary(self, *operator, lhs, rhs)
            }
            ExprKind::UnaryExpression { operator, operand } => {
                let value = self.eval(operand, env)?;
                arithmetic::unary(*operator, value)
            }
            ExprKind::PostfixExpression { operator, operand } => {
                let value = self.eval(operand, env)?;
                match operator {
                    PostfixOp::Factorial => arithmetic::factorial(value),
                }
            }
            ExprKind::FunctionCall { name, arguments } => {
                let args = arguments
                    .iter()
                    .map(|arg| self.eval(arg, env))
                    .collect::<ReckonResult<Vec<_>>>()?;
                functions::call(self, name, args)
            }
            ExprKind::Variable { name } => self.resolve_variable(name, env),
            ExprKind::Constant { name } => resolve_constant(name),
            ExprKind::Value { literal } => self.eval_number_literal(literal),
            ExprKind::CompositeValue { parts } => self.eval_composite_literal(parts),
            ExprKind::BooleanLiteral { value } => Ok(Value::Bool(*value)),
            ExprKind::PlainDate { year, month, day } => {
                Ok(Value::Date(make_date(*year, *month, *day)?))
            }
            ExprKind::PlainTime {
                hour,
                minute,
                second,
                millisecond,
            } => Ok(Value::Time(make_time(*hour, *minute, *second, *millisecond)?)),
            ExprKind::PlainDateTime {
                year,
                month,
                day,
                hour,
                minute,
                second,
                millisecond,
            } => {
                let date = make_date(*year, *month, *day)?;
                let time = make_time(*hour, *minute, *second, *millisecond)?;
                Ok(Value::DateTime(date.and_time(time)))
            }
            ExprKind::Instant { epoch_milliseconds } => Ok(Value::Instant(
                Instant::from_epoch_milliseconds(*epoch_milliseconds),
            )),
            ExprKind::ZonedDateTime {
                year,
                month,
                day,
                hour,
                minute,
                second,
                millisecond,
                timezone,
            } => {
                let tz = self.registry.timezone_resolve(timezone)?;
                let date = make_date(*year, *month, *day)?;
                let time = make_time(*hour, *minute, *second, *millisecond)?;
                Ok(Value::Zoned(temporal::resolve_local(
                    tz,
                    date.and_time(time),
                )?))
            }
        }
    }

    // ==== Name resolution ====

    /// Variables resolve through the scope chain, then as bare units
    /// (`m` in an arithmetic context means `1 m`), then as temporal
    /// keywords.
    fn resolve_variable(&self, name: &str, env: &Environment) -> ReckonResult<Value> {
        if let Some(value) = env.lookup(name) {
            return Ok(value.clone());
        }
        if let Some(unit) = self
            .registry
            .unit_by_name(name)
            .or_else(|| self.registry.unit_by_name_fallback(name))
        {
            log::debug!("reading bare '{name}' as 1 {}", unit.id);
            return Ok(Value::Number(Numeric::num_unit(1.0, unit)));
        }
        let engine = self.temporal();
        match name {
            "now" => Ok(Value::Zoned(engine.now_zoned()?)),
            "today" => Ok(Value::Date(engine.today()?)),
            "tomorrow" => Ok(Value::Date(engine.today_offset(1)?)),
            "yesterday" => Ok(Value::Date(engine.today_offset(-1)?)),
            _ => Err(ReckonError::unknown_variable()
                .with_message(format!("'{name}' is not defined"))),
        }
    }

    // ==== Literals ====

    fn eval_number_literal(&self, literal: &NumberLiteral) -> ReckonResult<Value> {
        let value = parse_digits(&literal.digits, literal.base, literal.kind)?;
        if literal.units.is_empty() {
            return Ok(Value::num(value));
        }
        let terms = self.resolve_unit_terms(&literal.units)?;
        Ok(Value::Number(Numeric::num_terms(value, terms)))
    }

    fn eval_composite_literal(&self, parts: &[CompositePart]) -> ReckonResult<Value> {
        let mut degree_seen = false;
        let mut components = Vec::with_capacity(parts.len());
        for part in parts {
            let value = parse_digits(&part.digits, part.base, part.kind)?;
            let unit = self.resolve_unit_node(&part.unit, &mut degree_seen)?;
            components.push(CompositeComponent::new(value, unit));
        }
        Ok(Value::Composite(CompositeValue::new(components)))
    }

    // ==== Unit spelling resolution ====

    /// Resolves a unit term list. The quote rule is tracked across the
    /// whole list: once a `°` has appeared, `'` and `"` mean arcminute
    /// and arcsecond instead of foot and inch.
    pub(crate) fn resolve_unit_terms(
        &self,
        nodes: &[UnitTermNode],
    ) -> ReckonResult<Vec<UnitTerm>> {
        let mut degree_seen = false;
        nodes
            .iter()
            .map(|node| {
                let unit = self.resolve_unit_node(&node.unit, &mut degree_seen)?;
                Ok(UnitTerm::new(unit, node.exponent))
            })
            .collect()
    }

    pub(crate) fn resolve_unit_node(
        &self,
        node: &UnitExprNode,
        degree_seen: &mut bool,
    ) -> ReckonResult<Arc<Unit>> {
        let unit = match node {
            UnitExprNode::Named(name) => self.resolve_named_unit(name, *degree_seen)?,
            UnitExprNode::CurrencyCode(code) => {
                let currency = self.registry.currency_by_code(code).ok_or_else(|| {
                    ReckonError::unknown_currency()
                        .with_message(format!("'{code}' is not a known currency"))
                })?;
                self.rates.materialize(&currency)?
            }
            UnitExprNode::CurrencySymbol { symbol, spaced } => {
                if self.registry.is_ambiguous_symbol(symbol) {
                    self.registry.ambiguous_currency_by_symbol(symbol)?
                } else {
                    let currency = if *spaced {
                        self.registry
                            .currency_by_symbol_spaced(symbol)
                            .or_else(|| self.registry.currency_by_symbol_adjacent(symbol))
                    } else {
                        self.registry
                            .currency_by_symbol_adjacent(symbol)
                            .or_else(|| self.registry.currency_by_symbol_spaced(symbol))
                    };
                    let currency = currency.ok_or_else(|| {
                        ReckonError::unknown_currency()
                            .with_message(format!("'{symbol}' is not a known currency symbol"))
                    })?;
                    self.rates.materialize(&currency)?
                }
            }
        };
        if unit.id == "degree" {
            *degree_seen = true;
        }
        Ok(unit)
    }

    fn resolve_named_unit(&self, name: &str, degree_seen: bool) -> ReckonResult<Arc<Unit>> {
        let contextual = match name {
            "'" | "′" => Some(if degree_seen { "arcminute" } else { "foot" }),
            "\"" | "″" => Some(if degree_seen { "arcsecond" } else { "inch" }),
            _ => None,
        };
        if let Some(id) = contextual {
            return self.registry.unit_by_id(id).ok_or_else(ReckonError::assert);
        }
        self.registry
            .unit_by_name(name)
            .or_else(|| self.registry.unit_by_name_fallback(name))
            .map(Ok)
            .unwrap_or_else(|| {
                // A spelled-out currency ("dollars") reads as one too.
                if let Some(currency) = self.registry.currency_by_code(name) {
                    return self.rates.materialize(&currency);
                }
                Err(ReckonError::unknown_unit()
                    .with_message(format!("'{name}' is not a known unit")))
            })
    }
}

// ==== Constants ====

fn resolve_constant(name: &str) -> ReckonResult<Value> {
    let value = match name {
        "pi" | "π" => PI,
        "tau" | "τ" => TAU,
        "e" => E,
        "phi" | "φ" => GOLDEN_RATIO,
        _ => {
            return Err(ReckonError::unknown_constant()
                .with_message(format!("'{name}' is not a known constant")))
        }
    };
    Ok(Value::num(value))
}

// ==== Digit parsing ====

/// Parses literal digit text in an arbitrary base. Fractional digits
/// contribute `digit × base⁻ⁿ`; a sign applies to the whole literal.
fn parse_digits(digits: &str, base: i64, kind: NumberKind) -> ReckonResult<f64> {
    if !(2..=36).contains(&base) {
        return Err(
            ReckonError::invalid_base().with_message(format!("base {base} is outside 2..=36"))
        );
    }
    if kind == NumberKind::Scientific {
        // Scientific notation only exists in base 10; the exponent
        // marker would be a digit anywhere else.
        if base != 10 {
            return Err(ReckonError::invalid_digit()
                .with_message("scientific notation requires base 10"));
        }
        return digits.trim().parse::<f64>().map_err(|_| {
            ReckonError::invalid_digit()
                .with_message(format!("'{digits}' is not a valid number"))
        });
    }

    let base_u = base as u32;
    let text = digits.trim();
    let (sign, text) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };

    let (integer_part, fraction_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text, None),
    };

    let mut value = 0.0_f64;
    let mut any_digit = false;
    for c in integer_part.chars() {
        if c == '_' {
            continue;
        }
        value = value * f64::from(base_u) + f64::from(digit_in_base(c, base_u)?);
        any_digit = true;
    }
    if let Some(fraction) = fraction_part {
        let mut weight = 1.0_f64;
        for c in fraction.chars() {
            if c == '_' {
                continue;
            }
            weight /= f64::from(base_u);
            value += f64::from(digit_in_base(c, base_u)?) * weight;
            any_digit = true;
        }
    }
    if !any_digit {
        return Err(ReckonError::invalid_digit()
            .with_message(format!("'{digits}' contains no digits")));
    }
    Ok(sign * value)
}

fn digit_in_base(c: char, base: u32) -> ReckonResult<u32> {
    c.to_digit(36)
        .filter(|d| *d < base)
        .ok_or_else(|| {
            ReckonError::invalid_digit()
                .with_message(format!("digit '{c}' is not valid in base {base}"))
        })
}

fn make_date(year: i32, month: u32, day: u32) -> ReckonResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        ReckonError::domain().with_message(format!("{year:04}-{month:02}-{day:02} is not a valid date"))
    })
}

fn make_time(hour: u32, minute: u32, second: u32, millisecond: u32) -> ReckonResult<NaiveTime> {
    NaiveTime::from_hms_milli_opt(hour, minute, second, millisecond)
        .ok_or_else(|| ReckonError::domain().with_message("not a valid wall-clock time"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, ConversionTarget, TemporalProperty, UnaryOp};
    use crate::host::FixedHooks;
    use crate::values::{CalendarDuration, PresentationFormat};
    use crate::ErrorKind;
    use chrono_tz::Tz;

    // 2024-01-15T12:00:00Z, a Monday.
    const FIXED_MS: i64 = 1_705_320_000_000;

    fn evaluator() -> Evaluator {
        Evaluator::new(
            Arc::new(UnitRegistry::builtin()),
            Arc::new(ExchangeRates::from_rates([("EUR", 1.1), ("GBP", 1.27)])),
            EvaluatorConfig::default(),
            Box::new(FixedHooks {
                epoch_ms: FIXED_MS,
                tz: Tz::UTC,
            }),
        )
    }

    fn node(kind: ExprKind) -> AstNode {
        AstNode::new(kind, 0)
    }

    fn lit(digits: &str) -> AstNode {
        lit_units(digits, &[])
    }

    fn lit_units(digits: &str, units: &[(&str, f64)]) -> AstNode {
        node(ExprKind::Value {
            literal: NumberLiteral {
                digits: digits.to_owned(),
                base: 10,
                kind: if digits.contains('.') {
                    NumberKind::Decimal
                } else {
                    NumberKind::Integer
                },
                units: units
                    .iter()
                    .map(|(name, exponent)| UnitTermNode::named_pow(name, *exponent))
                    .collect(),
            },
        })
    }

    fn lit_base(digits: &str, base: i64) -> AstNode {
        node(ExprKind::Value {
            literal: NumberLiteral {
                digits: digits.to_owned(),
                base,
                kind: if digits.contains('.') {
                    NumberKind::Decimal
                } else {
                    NumberKind::Integer
                },
                units: Vec::new(),
            },
        })
    }

    fn bin(operator: BinaryOp, left: AstNode, right: AstNode) -> AstNode {
        node(ExprKind::BinaryExpression {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn convert_units(value: AstNode, units: &[(&str, f64)]) -> AstNode {
        node(ExprKind::Conversion {
            value: Box::new(value),
            target: ConversionTarget::Units(
                units
                    .iter()
                    .map(|(name, exponent)| UnitTermNode::named_pow(name, *exponent))
                    .collect(),
            ),
        })
    }

    fn date_node(year: i32, month: u32, day: u32) -> AstNode {
        node(ExprKind::PlainDate { year, month, day })
    }

    fn call(name: &str, arguments: Vec<AstNode>) -> AstNode {
        node(ExprKind::FunctionCall {
            name: name.to_owned(),
            arguments,
        })
    }

    fn variable(name: &str) -> AstNode {
        node(ExprKind::Variable {
            name: name.to_owned(),
        })
    }

    fn eval(ast: &AstNode) -> ReckonResult<Value> {
        evaluator().evaluate(ast, &mut Environment::new())
    }

    fn eval_number(ast: &AstNode) -> Numeric {
        match eval(ast).expect("evaluation") {
            Value::Number(n) => n,
            other => panic!("expected a number, got {other:?}"),
        }
    }

    fn assert_close(a: f64, b: f64) {
        assert!(
            (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0),
            "{a} !≈ {b}"
        );
    }

    // ==== Concrete scenarios ====

    #[test]
    fn force_reduction_names_the_dimension() {
        // 9.8 m/s² × 2 kg = 19.6 N
        let ast = bin(
            BinaryOp::Multiply,
            lit_units("9.8", &[("m", 1.0), ("s", -2.0)]),
            lit_units("2", &[("kg", 1.0)]),
        );
        let n = eval_number(&ast);
        assert_close(n.value, 19.6);
        assert_eq!(n.simple_unit().map(|u| u.id.as_str()), Some("newton"));
    }

    #[test]
    fn greedy_composite_conversion() {
        // 1.71 m to ft in = 5 ft 7.32… in
        let ast = convert_units(lit_units("1.71", &[("m", 1.0)]), &[("ft", 1.0), ("in", 1.0)]);
        let Value::Composite(c) = eval(&ast).expect("evaluation") else {
            panic!("expected a composite");
        };
        assert_eq!(c.components.len(), 2);
        assert_eq!(c.components[0].unit.id, "foot");
        assert_eq!(c.components[0].value, 5.0);
        assert_eq!(c.components[1].unit.id, "inch");
        assert_close(c.components[1].value, 7.322_834_645_669_229);
    }

    #[test]
    fn plain_date_difference_is_a_day_duration() {
        let ast = bin(
            BinaryOp::Subtract,
            date_node(2024, 1, 15),
            date_node(2024, 1, 1),
        );
        let Value::Duration(d) = eval(&ast).expect("evaluation") else {
            panic!("expected a duration");
        };
        assert_eq!(d.days, 14.0);
        assert!(!d.has_time_components());
    }

    #[test]
    fn currency_addition_through_a_conversion() {
        // 100 USD + (50 EUR to USD) with 1 EUR = 1.1 USD
        let ast = bin(
            BinaryOp::Add,
            lit_units("100", &[("USD", 1.0)]),
            convert_units(lit_units("50", &[("EUR", 1.0)]), &[("USD", 1.0)]),
        );
        let n = eval_number(&ast);
        assert_close(n.value, 155.0);
        assert_eq!(n.simple_unit().map(|u| u.id.as_str()), Some("USD"));
    }

    #[test]
    fn conditional_compares_across_units_and_takes_one_branch() {
        // if 5 m > 300 cm then 1 else (1/0): the untaken branch must not run.
        let ast = node(ExprKind::ConditionalExpr {
            condition: Box::new(bin(
                BinaryOp::Greater,
                lit_units("5", &[("m", 1.0)]),
                lit_units("300", &[("cm", 1.0)]),
            )),
            then_branch: Box::new(lit("1")),
            else_branch: Box::new(bin(BinaryOp::Divide, lit("1"), lit("0"))),
        });
        assert_eq!(eval(&ast).expect("evaluation"), Value::num(1.0));
    }

    #[test]
    fn composite_subtraction_flattens_to_the_left_unit() {
        // 10 ft − (5 ft 6 in) = 4.5 ft
        let composite = node(ExprKind::CompositeValue {
            parts: vec![
                CompositePart {
                    digits: "5".to_owned(),
                    base: 10,
                    kind: NumberKind::Integer,
                    unit: UnitExprNode::Named("ft".to_owned()),
                },
                CompositePart {
                    digits: "6".to_owned(),
                    base: 10,
                    kind: NumberKind::Integer,
                    unit: UnitExprNode::Named("in".to_owned()),
                },
            ],
        });
        let ast = bin(BinaryOp::Subtract, lit_units("10", &[("ft", 1.0)]), composite);
        let n = eval_number(&ast);
        assert_close(n.value, 4.5);
        assert_eq!(n.simple_unit().map(|u| u.id.as_str()), Some("foot"));
    }

    #[test]
    fn quotes_mean_arcminutes_after_a_degree() {
        // 30°15'30" to degrees ≈ 30.2583°
        let composite = node(ExprKind::CompositeValue {
            parts: vec![
                CompositePart {
                    digits: "30".to_owned(),
                    base: 10,
                    kind: NumberKind::Integer,
                    unit: UnitExprNode::Named("°".to_owned()),
                },
                CompositePart {
                    digits: "15".to_owned(),
                    base: 10,
                    kind: NumberKind::Integer,
                    unit: UnitExprNode::Named("'".to_owned()),
                },
                CompositePart {
                    digits: "30".to_owned(),
                    base: 10,
                    kind: NumberKind::Integer,
                    unit: UnitExprNode::Named("\"".to_owned()),
                },
            ],
        });
        let ast = convert_units(composite, &[("degree", 1.0)]);
        let n = eval_number(&ast);
        assert_close(n.value, 30.0 + 15.0 / 60.0 + 30.0 / 3600.0);
    }

    #[test]
    fn quotes_mean_feet_and_inches_without_a_degree() {
        let composite = node(ExprKind::CompositeValue {
            parts: vec![
                CompositePart {
                    digits: "5".to_owned(),
                    base: 10,
                    kind: NumberKind::Integer,
                    unit: UnitExprNode::Named("'".to_owned()),
                },
                CompositePart {
                    digits: "6".to_owned(),
                    base: 10,
                    kind: NumberKind::Integer,
                    unit: UnitExprNode::Named("\"".to_owned()),
                },
            ],
        });
        let Value::Composite(c) = eval(&composite).expect("evaluation") else {
            panic!("expected a composite");
        };
        assert_eq!(c.components[0].unit.id, "foot");
        assert_eq!(c.components[1].unit.id, "inch");
    }

    #[test]
    fn now_minus_a_shifted_now_is_the_shift() {
        // now − (now − 2 days) = 2 days under the fixed clock.
        let two_days_ago = bin(
            BinaryOp::Subtract,
            variable("now"),
            lit_units("2", &[("day", 1.0)]),
        );
        let ast = bin(BinaryOp::Subtract, variable("now"), two_days_ago);
        let Value::Duration(d) = eval(&ast).expect("evaluation") else {
            panic!("expected a duration");
        };
        assert_eq!(d.days, 2.0);
        assert!(!d.has_time_components());
    }

    // ==== Property-style invariants ====

    #[test]
    fn simple_conversion_round_trips() {
        let ast = convert_units(
            convert_units(lit_units("1.71", &[("m", 1.0)]), &[("ft", 1.0)]),
            &[("m", 1.0)],
        );
        let n = eval_number(&ast);
        assert_close(n.value, 1.71);
    }

    #[test]
    fn multiply_then_divide_restores_units_and_value() {
        // (2 m × 3 kg) ÷ 3 kg = 2 m, in units and in value.
        let ast = bin(
            BinaryOp::Divide,
            bin(
                BinaryOp::Multiply,
                lit_units("2", &[("m", 1.0)]),
                lit_units("3", &[("kg", 1.0)]),
            ),
            lit_units("3", &[("kg", 1.0)]),
        );
        let n = eval_number(&ast);
        assert_close(n.value, 2.0);
        assert_eq!(n.simple_unit().map(|u| u.id.as_str()), Some("meter"));
    }

    #[test]
    fn same_dimension_division_is_dimensionless() {
        let ast = bin(
            BinaryOp::Divide,
            lit_units("10", &[("ft", 1.0)]),
            lit_units("5", &[("ft", 1.0)]),
        );
        let n = eval_number(&ast);
        assert!(n.is_dimensionless());
        assert_close(n.value, 2.0);
    }

    #[test]
    fn wrapping_formats_preserve_the_inner_value() {
        let ast = node(ExprKind::Conversion {
            value: Box::new(lit("255")),
            target: ConversionTarget::Format(PresentationFormat::Hex),
        });
        let Value::Presentation(p) = eval(&ast).expect("evaluation") else {
            panic!("expected a presentation");
        };
        assert_eq!(p.format, PresentationFormat::Hex);
        assert_eq!(*p.inner, Value::num(255.0));
    }

    #[test]
    fn temporal_add_of_a_difference_restores_the_operand() {
        // a + (b − a) == b
        let a = date_node(2024, 2, 10);
        let b = date_node(2024, 3, 1);
        let ast = bin(
            BinaryOp::Add,
            a.clone(),
            bin(BinaryOp::Subtract, b.clone(), a),
        );
        assert_eq!(eval(&ast).expect("evaluation"), eval(&b).expect("evaluation"));
    }

    // ==== Boundaries ====

    #[test]
    fn bases_outside_the_range_are_rejected() {
        for base in [1, 0, 37, -2] {
            let err = eval(&lit_base("10", base)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidBase, "base {base}");
        }
    }

    #[test]
    fn digits_must_fit_the_base() {
        let err = eval(&lit_base("12G", 16)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDigitForBase);
        assert_eq!(eval(&lit_base("ff", 16)).expect("evaluation"), Value::num(255.0));
        // Fraction digits weigh base⁻ⁿ; the sign covers the whole literal.
        assert_eq!(eval(&lit_base("-0.1", 2)).expect("evaluation"), Value::num(-0.5));
    }

    #[test]
    fn factorial_boundaries() {
        let fact = |digits: &str| {
            eval(&node(ExprKind::PostfixExpression {
                operator: PostfixOp::Factorial,
                operand: Box::new(lit(digits)),
            }))
        };
        assert_eq!(fact("0").expect("0!"), Value::num(1.0));
        let Value::Number(large) = fact("170").expect("170!") else {
            panic!("expected a number");
        };
        assert!(large.value.is_finite());
        let Value::Number(overflow) = fact("171").expect("171!") else {
            panic!("expected a number");
        };
        assert!(overflow.value.is_infinite());
        assert_eq!(fact("2.5").unwrap_err().kind(), ErrorKind::DomainError);
        let negated = node(ExprKind::PostfixExpression {
            operator: PostfixOp::Factorial,
            operand: Box::new(node(ExprKind::UnaryExpression {
                operator: UnaryOp::Negate,
                operand: Box::new(lit("3")),
            })),
        });
        assert_eq!(eval(&negated).unwrap_err().kind(), ErrorKind::DomainError);
    }

    #[test]
    fn domain_errors_from_functions() {
        let sqrt = call("sqrt", vec![node(ExprKind::UnaryExpression {
            operator: UnaryOp::Negate,
            operand: Box::new(lit("1")),
        })]);
        assert_eq!(eval(&sqrt).unwrap_err().kind(), ErrorKind::DomainError);
        let asin = call("asin", vec![lit("2")]);
        assert_eq!(eval(&asin).unwrap_err().kind(), ErrorKind::DomainError);
        let log = call("ln", vec![lit("0")]);
        assert_eq!(eval(&log).unwrap_err().kind(), ErrorKind::DomainError);
    }

    #[test]
    fn division_by_zero_is_typed() {
        let ast = bin(BinaryOp::Divide, lit("1"), lit("0"));
        assert_eq!(eval(&ast).unwrap_err().kind(), ErrorKind::DivisionByZero);
    }

    // ==== Dispatcher behavior ====

    #[test]
    fn assignments_commit_only_on_success() {
        let ev = evaluator();
        let mut env = Environment::new();

        let ok = node(ExprKind::VariableAssignment {
            name: "x".to_owned(),
            value: Box::new(lit_units("5", &[("m", 1.0)])),
        });
        ev.evaluate(&ok, &mut env).expect("assignment");
        assert!(env.lookup("x").is_some());

        let failing = node(ExprKind::VariableAssignment {
            name: "y".to_owned(),
            value: Box::new(bin(BinaryOp::Divide, lit("1"), lit("0"))),
        });
        assert!(ev.evaluate(&failing, &mut env).is_err());
        assert!(env.lookup("y").is_none());

        // Later lines observe earlier assignments.
        let use_x = bin(BinaryOp::Multiply, variable("x"), lit("2"));
        let n = match ev.evaluate(&use_x, &mut env).expect("evaluation") {
            Value::Number(n) => n,
            other => panic!("expected a number, got {other:?}"),
        };
        assert_close(n.value, 10.0);
    }

    #[test]
    fn trial_evaluation_never_mutates() {
        let ev = evaluator();
        let env = Environment::new();
        let assignment = node(ExprKind::VariableAssignment {
            name: "x".to_owned(),
            value: Box::new(lit("42")),
        });
        let (value, binding) = ev.evaluate_trial(&assignment, &env).expect("trial");
        assert_eq!(value, Value::num(42.0));
        assert_eq!(binding, Some(("x".to_owned(), Value::num(42.0))));
        assert!(env.lookup("x").is_none());
    }

    #[test]
    fn bare_units_and_keywords_back_up_variables() {
        let n = eval_number(&variable("m"));
        assert_eq!(n.value, 1.0);
        assert_eq!(n.simple_unit().map(|u| u.id.as_str()), Some("meter"));

        let Value::Date(today) = eval(&variable("today")).expect("today") else {
            panic!("expected a date");
        };
        assert_eq!(today, NaiveDate::from_ymd_opt(2024, 1, 15).expect("date"));

        let err = eval(&variable("definitely_not_a_thing")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownVariable);
    }

    #[test]
    fn constants_resolve_and_unknowns_error() {
        let pi = eval(&node(ExprKind::Constant {
            name: "pi".to_owned(),
        }))
        .expect("pi");
        assert_eq!(pi, Value::num(PI));
        let err = eval(&node(ExprKind::Constant {
            name: "answer".to_owned(),
        }))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownConstant);
    }

    #[test]
    fn ambiguous_symbols_combine_with_themselves_only() {
        let dollar = |digits: &str| {
            node(ExprKind::Value {
                literal: NumberLiteral {
                    digits: digits.to_owned(),
                    base: 10,
                    kind: NumberKind::Integer,
                    units: vec![UnitTermNode {
                        unit: UnitExprNode::CurrencySymbol {
                            symbol: "$".to_owned(),
                            spaced: false,
                        },
                        exponent: 1.0,
                    }],
                },
            })
        };
        let same = bin(BinaryOp::Add, dollar("5"), dollar("5"));
        let n = eval_number(&same);
        assert_close(n.value, 10.0);

        let mixed = bin(BinaryOp::Add, dollar("5"), lit_units("5", &[("EUR", 1.0)]));
        assert_eq!(eval(&mixed).unwrap_err().kind(), ErrorKind::DimensionMismatch);
    }

    #[test]
    fn affine_temperature_addition_keeps_the_left_unit() {
        // 20 °C + 18 °F: the right side converts into the left unit.
        let ast = bin(
            BinaryOp::Add,
            lit_units("20", &[("celsius", 1.0)]),
            lit_units("18", &[("fahrenheit", 1.0)]),
        );
        let n = eval_number(&ast);
        assert_eq!(n.simple_unit().map(|u| u.id.as_str()), Some("celsius"));
        assert_close(n.value, 20.0 + (18.0 - 32.0) * 5.0 / 9.0);
    }

    #[test]
    fn power_takes_roots_of_derived_units() {
        // (4 m²) ^ 0.5 = 2 m
        let ast = bin(
            BinaryOp::Power,
            lit_units("4", &[("m", 2.0)]),
            lit("0.5"),
        );
        let n = eval_number(&ast);
        assert_close(n.value, 2.0);
        assert_eq!(n.terms.len(), 1);
        assert_eq!(n.terms[0].unit.id, "meter");
        assert_eq!(n.terms[0].exponent, 1.0);
    }

    #[test]
    fn trig_uses_the_angle_setting_and_explicit_units() {
        // Default setting is degrees.
        let Value::Number(sine) = eval(&call("sin", vec![lit("90")])).expect("sin") else {
            panic!("expected a number");
        };
        assert_close(sine.value, 1.0);

        let explicit = call("sin", vec![lit_units("90", &[("degree", 1.0)])]);
        let Value::Number(sine) = eval(&explicit).expect("sin") else {
            panic!("expected a number");
        };
        assert_close(sine.value, 1.0);

        let Value::Number(arc) = eval(&call("asin", vec![lit("1")])).expect("asin") else {
            panic!("expected a number");
        };
        assert_close(arc.value, 90.0);
        assert_eq!(arc.simple_unit().map(|u| u.id.as_str()), Some("degree"));
    }

    #[test]
    fn rounding_with_a_united_step() {
        // round(1.71 m, 5 cm) = 170 cm
        let ast = call(
            "round",
            vec![
                lit_units("1.71", &[("m", 1.0)]),
                lit_units("5", &[("cm", 1.0)]),
            ],
        );
        let n = eval_number(&ast);
        assert_close(n.value, 170.0);
        assert_eq!(n.simple_unit().map(|u| u.id.as_str()), Some("centimeter"));
    }

    #[test]
    fn precision_formats_apply_in_place() {
        let ast = node(ExprKind::Conversion {
            value: Box::new(lit("3.14159")),
            target: ConversionTarget::Format(PresentationFormat::Decimals(2)),
        });
        let Value::Number(n) = eval(&ast).expect("evaluation") else {
            panic!("expected a number");
        };
        assert_close(n.value, 3.14);
        assert!(n.precision.is_some());
    }

    #[test]
    fn percentage_rejects_dimensioned_values() {
        let ast = node(ExprKind::Conversion {
            value: Box::new(lit_units("5", &[("m", 1.0)])),
            target: ConversionTarget::Format(PresentationFormat::Percentage),
        });
        assert_eq!(eval(&ast).unwrap_err().kind(), ErrorKind::FormatIncompatible);
    }

    #[test]
    fn timezone_retargeting_keeps_the_instant() {
        let ast = node(ExprKind::Conversion {
            value: Box::new(node(ExprKind::Instant {
                epoch_milliseconds: FIXED_MS,
            })),
            target: ConversionTarget::Timezone("America/New_York".to_owned()),
        });
        let Value::Zoned(zoned) = eval(&ast).expect("evaluation") else {
            panic!("expected a zoned datetime");
        };
        assert_eq!(zoned.timestamp_millis(), FIXED_MS);
        // 12:00 UTC in mid-January is 07:00 in New York.
        assert_eq!(zoned.naive_local().format("%H:%M").to_string(), "07:00");
    }

    #[test]
    fn property_extraction_reads_calendar_fields() {
        let weekday = node(ExprKind::Conversion {
            value: Box::new(date_node(2024, 1, 15)),
            target: ConversionTarget::Property(TemporalProperty::Weekday),
        });
        assert_eq!(eval(&weekday).expect("weekday"), Value::num(1.0));

        let not_applicable = node(ExprKind::Conversion {
            value: Box::new(date_node(2024, 1, 15)),
            target: ConversionTarget::Property(TemporalProperty::Hour),
        });
        assert_eq!(
            eval(&not_applicable).unwrap_err().kind(),
            ErrorKind::PropertyNotApplicable
        );
    }

    #[test]
    fn unix_formats_transform_instead_of_wrapping() {
        let ast = node(ExprKind::Conversion {
            value: Box::new(node(ExprKind::Instant {
                epoch_milliseconds: FIXED_MS,
            })),
            target: ConversionTarget::Format(PresentationFormat::Unix),
        });
        assert_eq!(
            eval(&ast).expect("evaluation"),
            Value::num(FIXED_MS as f64 / 1000.0)
        );
    }

    #[test]
    fn duration_scaling_through_the_operator_table() {
        // (2024-01-15 − 2024-01-01) × 2 = 28 days
        let difference = bin(
            BinaryOp::Subtract,
            date_node(2024, 1, 15),
            date_node(2024, 1, 1),
        );
        let ast = bin(BinaryOp::Multiply, difference, lit("2"));
        let Value::Duration(d) = eval(&ast).expect("evaluation") else {
            panic!("expected a duration");
        };
        assert_eq!(d, CalendarDuration::from_field(crate::values::DurationField::Days, 28.0));
    }

    #[test]
    fn per_reads_as_division() {
        let ast = bin(
            BinaryOp::Per,
            lit_units("90", &[("km", 1.0)]),
            lit_units("1", &[("hour", 1.0)]),
        );
        let n = eval_number(&ast);
        assert_close(n.value, 90.0);
        assert_eq!(n.terms.len(), 2);
        assert_eq!(n.terms[0].unit.id, "kilometer");
        assert_eq!(n.terms[1].unit.id, "hour");
        assert_eq!(n.terms[1].exponent, -1.0);
    }

    #[test]
    fn modulo_requires_dimensionless_operands() {
        let ok = bin(BinaryOp::Modulo, lit("7"), lit("3"));
        assert_eq!(eval(&ok).expect("modulo"), Value::num(1.0));
        let bad = bin(
            BinaryOp::Modulo,
            lit_units("7", &[("m", 1.0)]),
            lit("3"),
        );
        assert_eq!(eval(&bad).unwrap_err().kind(), ErrorKind::DimensionMismatch);
    }

    #[test]
    fn extrema_answer_in_the_first_unit() {
        let ast = call(
            "min",
            vec![lit_units("3", &[("ft", 1.0)], ), lit_units("1", &[("m", 1.0)])],
        );
        let n = eval_number(&ast);
        assert_eq!(n.simple_unit().map(|u| u.id.as_str()), Some("foot"));
        assert_close(n.value, 3.0);
    }

    #[test]
    fn incompatible_addition_is_a_dimension_mismatch() {
        let ast = bin(
            BinaryOp::Add,
            lit_units("1", &[("m", 1.0)]),
            lit_units("1", &[("kg", 1.0)]),
        );
        assert_eq!(eval(&ast).unwrap_err().kind(), ErrorKind::DimensionMismatch);
    }
}
