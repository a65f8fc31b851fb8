//! The input AST.
//!
//! The parser is an external collaborator; it hands the evaluator this
//! tree and nothing else. Nodes are deliberately dumb data: numeric
//! literals arrive as raw digit text plus a base (digit validation is
//! evaluation work, so `12G hex` fails with a typed error rather than a
//! parse error), and unit spellings arrive unresolved because their
//! meaning can depend on evaluator state (`'` is feet or arcminutes
//! depending on an earlier `°`).
//!
//! Every node carries the source offset the parser saw it at, so hosts
//! can map errors back onto the document.

use crate::values::PresentationFormat;

/// A binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// The spelled synonym for division (`90 km per hour`).
    Per,
    Modulo,
    Power,
    Equal,
    NotEqual,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    And,
    Or,
}

/// A prefix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
}

/// A postfix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Factorial,
}

/// How a numeric literal's digit text should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    /// Whole digits only.
    Integer,
    /// Digits with a radix point.
    Decimal,
    /// Base-10 scientific notation (`1.5e3`).
    Scientific,
}

/// An unresolved unit spelling inside a literal or conversion target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitExprNode {
    /// A name or symbol to resolve against the registry.
    Named(String),
    /// An ISO 4217 currency code.
    CurrencyCode(String),
    /// A currency symbol and how it was written.
    CurrencySymbol {
        symbol: String,
        /// Written with a space (`12 kr`) rather than adjacent (`€12`).
        spaced: bool,
    },
}

/// One `(unit, exponent)` entry of a literal's unit annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTermNode {
    pub unit: UnitExprNode,
    pub exponent: f64,
}

impl UnitTermNode {
    /// An exponent-1 term for a named unit.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            unit: UnitExprNode::Named(name.to_owned()),
            exponent: 1.0,
        }
    }

    /// A term for a named unit at an explicit exponent.
    #[must_use]
    pub fn named_pow(name: &str, exponent: f64) -> Self {
        Self {
            unit: UnitExprNode::Named(name.to_owned()),
            exponent,
        }
    }
}

/// A numeric literal: digit text, base, reading, and unit annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberLiteral {
    /// Raw digit text, optionally signed, optionally with a radix point.
    pub digits: String,
    /// The numeric base; validated at evaluation time.
    pub base: i64,
    pub kind: NumberKind,
    /// Unit terms, empty for a bare number.
    pub units: Vec<UnitTermNode>,
}

/// One `value unit` pair of a composite literal (`5 ft`, `30 °`).
#[derive(Debug, Clone, PartialEq)]
pub struct CompositePart {
    pub digits: String,
    pub base: i64,
    pub kind: NumberKind,
    pub unit: UnitExprNode,
}

/// A temporal property extraction target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalProperty {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
    Weekday,
    DayOfYear,
    WeekOfYear,
    Offset,
}

/// The right side of a `to` conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionTarget {
    /// Convert into a unit term list.
    Units(Vec<UnitTermNode>),
    /// Apply or wrap a presentation format.
    Format(PresentationFormat),
    /// Extract a temporal property.
    Property(TemporalProperty),
    /// Retarget into an IANA zone.
    Timezone(String),
    /// Unwrap one presentation level.
    Value,
}

/// A node of the input tree.
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub kind: ExprKind,
    /// Byte offset of the node in the source line.
    pub offset: usize,
}

impl AstNode {
    /// Creates a node at a source offset.
    #[must_use]
    pub fn new(kind: ExprKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// The node kinds produced by the parser.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ExprKind {
    VariableAssignment {
        name: String,
        value: Box<AstNode>,
    },
    ConditionalExpr {
        condition: Box<AstNode>,
        then_branch: Box<AstNode>,
        else_branch: Box<AstNode>,
    },
    Conversion {
        value: Box<AstNode>,
        target: ConversionTarget,
    },
    BinaryExpression {
        operator: BinaryOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    UnaryExpression {
        operator: UnaryOp,
        operand: Box<AstNode>,
    },
    PostfixExpression {
        operator: PostfixOp,
        operand: Box<AstNode>,
    },
    FunctionCall {
        name: String,
        arguments: Vec<AstNode>,
    },
    Variable {
        name: String,
    },
    Constant {
        name: String,
    },
    Value {
        literal: NumberLiteral,
    },
    CompositeValue {
        parts: Vec<CompositePart>,
    },
    BooleanLiteral {
        value: bool,
    },
    PlainDate {
        year: i32,
        month: u32,
        day: u32,
    },
    PlainTime {
        hour: u32,
        minute: u32,
        second: u32,
        millisecond: u32,
    },
    PlainDateTime {
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        millisecond: u32,
    },
    Instant {
        epoch_milliseconds: i64,
    },
    ZonedDateTime {
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
        millisecond: u32,
        timezone: String,
    },
}
