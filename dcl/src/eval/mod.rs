pub mod context;
pub mod value;

pub use context::{EvalContext, EvalFn};
pub use value::Value;

use std::collections::BTreeMap;
use std::ops::Range;

use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::expr::{BinaryOperator, ExprKind, Expression, TemplatePart, UnaryOperator};

/// Evaluate an expression.
///
/// With `None` for the context the expression must be entirely
/// self-contained: any variable reference or function call is an error.
/// Static contexts probe expressions this way to find out whether they
/// could ever need external input.
///
/// Evaluation keeps going past failures where it can, so one call reports
/// everything wrong with the expression. When the diagnostics contain
/// errors the returned value is a placeholder and must not be used.
pub fn evaluate(expr: &Expression, ctx: Option<&EvalContext>, file_id: usize) -> (Value, Diagnostics) {
    let mut diags = Diagnostics::new();
    let value = eval(expr, ctx, file_id, &mut diags).unwrap_or(Value::Null);
    (value, diags)
}

/// `None` means the failure was already reported. Operators propagate it
/// without piling type errors on top of a placeholder value.
fn eval(
    expr: &Expression,
    ctx: Option<&EvalContext>,
    file_id: usize,
    diags: &mut Diagnostics,
) -> Option<Value> {
    match &expr.kind {
        ExprKind::StringLiteral(s) => Some(Value::String(s.clone())),
        ExprKind::NumberLiteral(n) => Some(Value::Number(*n)),
        ExprKind::BooleanLiteral(b) => Some(Value::Bool(*b)),
        ExprKind::NullLiteral => Some(Value::Null),

        ExprKind::Template(parts) => {
            let mut out = String::new();
            let mut failed = false;
            for part in parts {
                match part {
                    TemplatePart::Literal(s) => out.push_str(s),
                    TemplatePart::Interpolation(inner) => {
                        match eval(inner, ctx, file_id, diags) {
                            None => failed = true,
                            Some(Value::String(s)) => out.push_str(&s),
                            Some(v @ (Value::Number(_) | Value::Bool(_))) => {
                                out.push_str(&v.to_string())
                            }
                            Some(other) => {
                                diags.push(Diagnostic::error(
                                    format!("cannot interpolate a {} value", other.type_name()),
                                    inner.span.clone(),
                                    file_id,
                                ));
                                failed = true;
                            }
                        }
                    }
                }
            }
            if failed { None } else { Some(Value::String(out)) }
        }

        ExprKind::Tuple(items) => {
            let mut values = Vec::with_capacity(items.len());
            let mut failed = false;
            for item in items {
                match eval(item, ctx, file_id, diags) {
                    Some(v) => values.push(v),
                    None => failed = true,
                }
            }
            if failed { None } else { Some(Value::Tuple(values)) }
        }

        ExprKind::Object(entries) => {
            let mut map = BTreeMap::new();
            let mut failed = false;
            for (key, value_expr) in entries {
                match eval(value_expr, ctx, file_id, diags) {
                    Some(v) => {
                        map.insert(key.clone(), v);
                    }
                    None => failed = true,
                }
            }
            if failed { None } else { Some(Value::Object(map)) }
        }

        ExprKind::Traversal { root, path } => {
            let Some(context) = ctx else {
                diags.push(Diagnostic::error(
                    "variables are not allowed here",
                    expr.span.clone(),
                    file_id,
                ));
                return None;
            };
            let Some(mut current) = context.get_variable(root) else {
                diags.push(Diagnostic::error(
                    format!("unknown variable \"{}\"", root),
                    expr.span.clone(),
                    file_id,
                ));
                return None;
            };
            for part in path {
                match current {
                    Value::Object(entries) => match entries.get(part) {
                        Some(next) => current = next,
                        None => {
                            diags.push(Diagnostic::error(
                                format!("object has no attribute \"{}\"", part),
                                expr.span.clone(),
                                file_id,
                            ));
                            return None;
                        }
                    },
                    other => {
                        diags.push(Diagnostic::error(
                            format!(
                                "cannot access attribute \"{}\" on a {} value",
                                part,
                                other.type_name()
                            ),
                            expr.span.clone(),
                            file_id,
                        ));
                        return None;
                    }
                }
            }
            Some(current.clone())
        }

        ExprKind::FunctionCall { name, args } => {
            let Some(context) = ctx else {
                diags.push(Diagnostic::error(
                    "function calls are not allowed here",
                    expr.span.clone(),
                    file_id,
                ));
                return None;
            };
            let Some(func) = context.get_function(name) else {
                diags.push(Diagnostic::error(
                    format!("call to unknown function \"{}\"", name),
                    expr.span.clone(),
                    file_id,
                ));
                return None;
            };
            let mut values = Vec::with_capacity(args.len());
            let mut failed = false;
            for arg in args {
                match eval(arg, ctx, file_id, diags) {
                    Some(v) => values.push(v),
                    None => failed = true,
                }
            }
            if failed {
                return None;
            }
            match func(&values) {
                Ok(v) => Some(v),
                Err(message) => {
                    diags.push(Diagnostic::error(
                        format!("error calling \"{}\": {}", name, message),
                        expr.span.clone(),
                        file_id,
                    ));
                    None
                }
            }
        }

        ExprKind::UnaryOperation { operator, operand } => {
            let v = eval(operand, ctx, file_id, diags)?;
            match operator {
                UnaryOperator::Negation => match v {
                    Value::Number(n) => Some(Value::Number(-n)),
                    other => {
                        diags.push(type_error("number", &other, &operand.span, file_id));
                        None
                    }
                },
                UnaryOperator::LogicalNot => match v {
                    Value::Bool(b) => Some(Value::Bool(!b)),
                    other => {
                        diags.push(type_error("bool", &other, &operand.span, file_id));
                        None
                    }
                },
            }
        }

        ExprKind::BinaryOperation {
            operator,
            left,
            right,
        } => {
            // Probe both sides before giving up so a single pass reports
            // problems in each operand.
            let l = eval(left, ctx, file_id, diags);
            let r = eval(right, ctx, file_id, diags);
            let (l, r) = (l?, r?);
            if matches!(
                operator,
                BinaryOperator::Equality | BinaryOperator::Inequality
            ) && l.type_name() != r.type_name()
            {
                diags.push(Diagnostic::warning(
                    format!(
                        "values of type {} and {} are never equal",
                        l.type_name(),
                        r.type_name()
                    ),
                    expr.span.clone(),
                    file_id,
                ));
            }
            match apply_binary(*operator, l, r, &expr.span, file_id) {
                Ok(v) => Some(v),
                Err(diag) => {
                    diags.push(diag);
                    None
                }
            }
        }

        ExprKind::Conditional {
            condition,
            true_branch,
            false_branch,
        } => {
            let cond = eval(condition, ctx, file_id, diags)?;
            let Value::Bool(b) = cond else {
                diags.push(type_error("bool", &cond, &condition.span, file_id));
                return None;
            };
            eval(if b { true_branch } else { false_branch }, ctx, file_id, diags)
        }
    }
}

fn type_error(expected: &str, got: &Value, span: &Range<usize>, file_id: usize) -> Diagnostic {
    Diagnostic::error(
        format!("type error: expected {}, got {}", expected, got.type_name()),
        span.clone(),
        file_id,
    )
}

fn number_operands(
    left: &Value,
    right: &Value,
    symbol: &str,
    span: &Range<usize>,
    file_id: usize,
) -> Result<(f64, f64), Diagnostic> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(Diagnostic::error(
            format!(
                "cannot apply \"{}\" to {} and {}",
                symbol,
                left.type_name(),
                right.type_name()
            ),
            span.clone(),
            file_id,
        )),
    }
}

fn bool_operands(
    left: &Value,
    right: &Value,
    symbol: &str,
    span: &Range<usize>,
    file_id: usize,
) -> Result<(bool, bool), Diagnostic> {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Ok((*a, *b)),
        _ => Err(Diagnostic::error(
            format!(
                "cannot apply \"{}\" to {} and {}",
                symbol,
                left.type_name(),
                right.type_name()
            ),
            span.clone(),
            file_id,
        )),
    }
}

fn apply_binary(
    op: BinaryOperator,
    left: Value,
    right: Value,
    span: &Range<usize>,
    file_id: usize,
) -> Result<Value, Diagnostic> {
    match op {
        BinaryOperator::Addition => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (l, r) => Err(Diagnostic::error(
                format!("cannot add {} and {}", l.type_name(), r.type_name()),
                span.clone(),
                file_id,
            )),
        },
        BinaryOperator::Subtraction => {
            let (a, b) = number_operands(&left, &right, "-", span, file_id)?;
            Ok(Value::Number(a - b))
        }
        BinaryOperator::Multiplication => {
            let (a, b) = number_operands(&left, &right, "*", span, file_id)?;
            Ok(Value::Number(a * b))
        }
        BinaryOperator::Division => {
            let (a, b) = number_operands(&left, &right, "/", span, file_id)?;
            if b == 0.0 {
                return Err(Diagnostic::error("division by zero", span.clone(), file_id));
            }
            Ok(Value::Number(a / b))
        }
        BinaryOperator::Modulo => {
            let (a, b) = number_operands(&left, &right, "%", span, file_id)?;
            if b == 0.0 {
                return Err(Diagnostic::error("modulo by zero", span.clone(), file_id));
            }
            Ok(Value::Number(a % b))
        }
        BinaryOperator::LogicalAnd => {
            let (a, b) = bool_operands(&left, &right, "&&", span, file_id)?;
            Ok(Value::Bool(a && b))
        }
        BinaryOperator::LogicalOr => {
            let (a, b) = bool_operands(&left, &right, "||", span, file_id)?;
            Ok(Value::Bool(a || b))
        }
        BinaryOperator::Equality => Ok(Value::Bool(left == right)),
        BinaryOperator::Inequality => Ok(Value::Bool(left != right)),
        BinaryOperator::GreaterThan => {
            let (a, b) = number_operands(&left, &right, ">", span, file_id)?;
            Ok(Value::Bool(a > b))
        }
        BinaryOperator::LessThan => {
            let (a, b) = number_operands(&left, &right, "<", span, file_id)?;
            Ok(Value::Bool(a < b))
        }
        BinaryOperator::GreaterThanOrEqual => {
            let (a, b) = number_operands(&left, &right, ">=", span, file_id)?;
            Ok(Value::Bool(a >= b))
        }
        BinaryOperator::LessThanOrEqual => {
            let (a, b) = number_operands(&left, &right, "<=", span, file_id)?;
            Ok(Value::Bool(a <= b))
        }
    }
}
