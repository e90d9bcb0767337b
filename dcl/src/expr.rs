use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOperator {
    Negation,
    LogicalNot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperator {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Modulo,
    LogicalAnd,
    LogicalOr,
    Equality,
    Inequality,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

/// One piece of a quoted string containing `${...}` interpolations.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Literal(String),
    Interpolation(Expression),
}

/// A value-producing expression together with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExprKind,
    pub span: Range<usize>,
}

impl Expression {
    pub fn new(kind: ExprKind, span: Range<usize>) -> Self {
        Expression { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    StringLiteral(String),
    NumberLiteral(f64),
    BooleanLiteral(bool),
    NullLiteral,

    /// A quoted string with at least one interpolation.
    Template(Vec<TemplatePart>),

    Tuple(Vec<Expression>),
    /// Key/value pairs in source order.
    Object(Vec<(String, Expression)>),

    /// A dotted reference: the root name plus the attribute path after it.
    Traversal { root: String, path: Vec<String> },

    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },

    UnaryOperation {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },

    BinaryOperation {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    Conditional {
        condition: Box<Expression>,
        true_branch: Box<Expression>,
        false_branch: Box<Expression>,
    },
}
