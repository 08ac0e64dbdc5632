//! Tree-walking evaluator for predicate expressions.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use time::Duration;

use super::parser::{ArithOp, CmpOp, Expr};
use super::ExprError;
use crate::relation::value::parse_date;
use crate::relation::Value;

const SECONDS_PER_DAY: i64 = 86_400;

/// Runtime value of a predicate sub-expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// Boolean, produced by literals, comparisons and connectives.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// Calendar date.
    Date(time::Date),
    /// String.
    Str(String),
}

impl Scalar {
    /// Truthiness: non-zero numbers, non-empty strings, any date.
    pub fn truthy(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Int(v) => *v != 0,
            Scalar::Float(v) => *v != 0.0,
            Scalar::Date(_) => true,
            Scalar::Str(s) => !s.is_empty(),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Scalar::Bool(_) => "bool",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
            Scalar::Date(_) => "date",
            Scalar::Str(_) => "string",
        }
    }

    fn number(&self) -> Option<Number> {
        match self {
            Scalar::Bool(b) => Some(Number::Int(i64::from(*b))),
            Scalar::Int(v) => Some(Number::Int(*v)),
            Scalar::Float(v) => Some(Number::Float(*v)),
            _ => None,
        }
    }

    fn integer(&self) -> Option<i64> {
        match self.number() {
            Some(Number::Int(v)) => Some(v),
            _ => None,
        }
    }
}

impl From<&Value> for Scalar {
    fn from(value: &Value) -> Self {
        match value {
            Value::Int(v) => Scalar::Int(*v),
            Value::Float(v) => Scalar::Float(*v),
            Value::Date(d) => Scalar::Date(*d),
            Value::Str(s) => Scalar::Str(s.clone()),
        }
    }
}

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

/// Attribute name to tuple position, resolved once per relation.
pub struct Bindings<'a> {
    slots: FxHashMap<&'a str, usize>,
}

impl<'a> Bindings<'a> {
    /// Maps each attribute of `header` to its column index.
    pub fn new(header: &'a [String]) -> Self {
        let slots = header
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();
        Self { slots }
    }

    fn lookup<'t>(&self, name: &str, tuple: &'t [Value]) -> Result<&'t Value, ExprError> {
        self.slots
            .get(name)
            .and_then(|idx| tuple.get(*idx))
            .ok_or_else(|| ExprError::UnknownAttribute(name.to_owned()))
    }
}

/// Evaluates `expr` against one tuple.
pub fn evaluate(expr: &Expr, bindings: &Bindings<'_>, tuple: &[Value]) -> Result<Scalar, ExprError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Attribute { name, field } => {
            let value = Scalar::from(bindings.lookup(name, tuple)?);
            match field {
                Some(field) => access_field(value, field),
                None => Ok(value),
            }
        }
        Expr::Not(inner) => Ok(Scalar::Bool(!evaluate(inner, bindings, tuple)?.truthy())),
        Expr::Neg(inner) => match evaluate(inner, bindings, tuple)? {
            Scalar::Float(v) => Ok(Scalar::Float(-v)),
            other => match other.integer() {
                Some(v) => v
                    .checked_neg()
                    .map(Scalar::Int)
                    .ok_or(ExprError::Overflow("-")),
                None => Err(ExprError::UnaryMismatch {
                    op: "-",
                    operand: other.type_name(),
                }),
            },
        },
        Expr::Pos(inner) => {
            let value = evaluate(inner, bindings, tuple)?;
            match value.number() {
                Some(Number::Int(v)) => Ok(Scalar::Int(v)),
                Some(Number::Float(v)) => Ok(Scalar::Float(v)),
                None => Err(ExprError::UnaryMismatch {
                    op: "+",
                    operand: value.type_name(),
                }),
            }
        }
        Expr::And(left, right) => {
            if !evaluate(left, bindings, tuple)?.truthy() {
                return Ok(Scalar::Bool(false));
            }
            Ok(Scalar::Bool(evaluate(right, bindings, tuple)?.truthy()))
        }
        Expr::Or(left, right) => {
            if evaluate(left, bindings, tuple)?.truthy() {
                return Ok(Scalar::Bool(true));
            }
            Ok(Scalar::Bool(evaluate(right, bindings, tuple)?.truthy()))
        }
        Expr::Compare { first, rest } => {
            let mut left = evaluate(first, bindings, tuple)?;
            for (op, operand) in rest {
                let right = evaluate(operand, bindings, tuple)?;
                if !compare(*op, &left, &right)? {
                    return Ok(Scalar::Bool(false));
                }
                left = right;
            }
            Ok(Scalar::Bool(true))
        }
        Expr::Arith { op, left, right } => {
            let left = evaluate(left, bindings, tuple)?;
            let right = evaluate(right, bindings, tuple)?;
            arithmetic(*op, left, right)
        }
    }
}

fn access_field(value: Scalar, field: &str) -> Result<Scalar, ExprError> {
    match (&value, field) {
        (Scalar::Date(d), "year") => Ok(Scalar::Int(i64::from(d.year()))),
        (Scalar::Date(d), "month") => Ok(Scalar::Int(i64::from(u8::from(d.month())))),
        (Scalar::Date(d), "day") => Ok(Scalar::Int(i64::from(d.day()))),
        (Scalar::Date(d), "weekday") => Ok(Scalar::Int(i64::from(
            d.weekday().number_days_from_monday(),
        ))),
        _ => Err(ExprError::UnknownField {
            field: field.to_owned(),
            ty: value.type_name(),
        }),
    }
}

fn ordering(left: &Scalar, right: &Scalar) -> Option<Ordering> {
    match (left, right) {
        (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
        (Scalar::Date(a), Scalar::Date(b)) => Some(a.cmp(b)),
        (Scalar::Date(a), Scalar::Str(s)) => parse_date(s.trim()).map(|b| a.cmp(&b)),
        (Scalar::Str(s), Scalar::Date(b)) => parse_date(s.trim()).map(|a| a.cmp(b)),
        _ => match (left.number()?, right.number()?) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        },
    }
}

fn compare(op: CmpOp, left: &Scalar, right: &Scalar) -> Result<bool, ExprError> {
    let Some(ord) = ordering(left, right) else {
        return match op {
            CmpOp::Eq => Ok(false),
            CmpOp::Ne => Ok(true),
            _ => Err(ExprError::TypeMismatch {
                op: op.as_str(),
                left: left.type_name(),
                right: right.type_name(),
            }),
        };
    };
    Ok(match op {
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::Ne => ord != Ordering::Equal,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Le => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Ge => ord != Ordering::Less,
    })
}

fn arithmetic(op: ArithOp, left: Scalar, right: Scalar) -> Result<Scalar, ExprError> {
    let mismatch = |left: &Scalar, right: &Scalar| ExprError::TypeMismatch {
        op: op.as_str(),
        left: left.type_name(),
        right: right.type_name(),
    };
    match (&left, &right) {
        (Scalar::Str(a), Scalar::Str(b)) if op == ArithOp::Add => {
            return Ok(Scalar::Str(format!("{a}{b}")))
        }
        (Scalar::Date(a), Scalar::Date(b)) if op == ArithOp::Sub => {
            return Ok(Scalar::Int((*a - *b).whole_days()))
        }
        (Scalar::Date(d), other) if matches!(op, ArithOp::Add | ArithOp::Sub) => {
            let days = other.integer().ok_or_else(|| mismatch(&left, &right))?;
            let days = if op == ArithOp::Sub {
                days.checked_neg().ok_or(ExprError::Overflow("-"))?
            } else {
                days
            };
            return shift_date(*d, days, op);
        }
        (other, Scalar::Date(d)) if op == ArithOp::Add => {
            let days = other.integer().ok_or_else(|| mismatch(&left, &right))?;
            return shift_date(*d, days, op);
        }
        _ => {}
    }
    let (a, b) = match (left.number(), right.number()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(mismatch(&left, &right)),
    };
    match (a, b) {
        (Number::Int(a), Number::Int(b)) => integer_arithmetic(op, a, b),
        (a, b) => float_arithmetic(op, a.as_f64(), b.as_f64()),
    }
}

fn shift_date(date: time::Date, days: i64, op: ArithOp) -> Result<Scalar, ExprError> {
    let overflow = ExprError::Overflow(op.as_str());
    let seconds = days.checked_mul(SECONDS_PER_DAY).ok_or(overflow.clone())?;
    date.checked_add(Duration::seconds(seconds))
        .map(Scalar::Date)
        .ok_or(overflow)
}

fn integer_arithmetic(op: ArithOp, a: i64, b: i64) -> Result<Scalar, ExprError> {
    let overflow = ExprError::Overflow(op.as_str());
    let value = match op {
        ArithOp::Add => a.checked_add(b).ok_or(overflow)?,
        ArithOp::Sub => a.checked_sub(b).ok_or(overflow)?,
        ArithOp::Mul => a.checked_mul(b).ok_or(overflow)?,
        ArithOp::Div => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            return Ok(Scalar::Float(a as f64 / b as f64));
        }
        ArithOp::FloorDiv => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            let quotient = a.checked_div(b).ok_or(overflow)?;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                quotient - 1
            } else {
                quotient
            }
        }
        ArithOp::Rem => {
            if b == 0 {
                return Err(ExprError::DivisionByZero);
            }
            let rem = a.checked_rem(b).ok_or(overflow)?;
            if rem != 0 && ((rem < 0) != (b < 0)) {
                rem + b
            } else {
                rem
            }
        }
    };
    Ok(Scalar::Int(value))
}

fn float_arithmetic(op: ArithOp, a: f64, b: f64) -> Result<Scalar, ExprError> {
    let divides = matches!(op, ArithOp::Div | ArithOp::FloorDiv | ArithOp::Rem);
    if divides && b == 0.0 {
        return Err(ExprError::DivisionByZero);
    }
    let value = match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        ArithOp::FloorDiv => (a / b).floor(),
        ArithOp::Rem => a - b * (a / b).floor(),
    };
    Ok(Scalar::Float(value))
}
