//! Condition evaluation for conditional tags
//!
//! Evaluates `Test` predicates and parsed test expressions against the request
//! bag plus the active foreach bindings. Lookups are null-safe: a missing path
//! is NULL and NULL compares false.

use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::str::FromStr;

use crate::core::{MapperError, ParamBag, Result, Value, ValueKind};
use crate::parser::{CompareOp, Expr};
use crate::statement::Test;

/// Item/index bound by one level of foreach
#[derive(Debug, Clone)]
pub struct Frame {
    pub item: String,
    pub index: Option<String>,
    pub value: Value,
    pub position: usize,
    position_value: Value,
}

impl Frame {
    #[must_use]
    pub fn new(item: &str, index: Option<&str>, value: Value, position: usize) -> Self {
        Self {
            item: item.to_string(),
            index: index.map(str::to_string),
            value,
            position,
            position_value: Value::Integer(position as i64),
        }
    }
}

/// Name resolution: innermost foreach frame first, then the request bag
pub struct Bindings<'a> {
    pub bag: &'a ParamBag,
    pub frames: &'a [Frame],
}

impl<'a> Bindings<'a> {
    fn same(&self, a: &str, b: &str) -> bool {
        if self.bag.ignore_case() {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }

    /// Innermost frame binding `root`, with whether it is the index name
    #[must_use]
    pub fn frame_for(&self, root: &str) -> Option<(usize, bool)> {
        self.frames.iter().enumerate().rev().find_map(|(i, frame)| {
            if self.same(&frame.item, root) {
                Some((i, false))
            } else if frame.index.as_deref().is_some_and(|idx| self.same(idx, root)) {
                Some((i, true))
            } else {
                None
            }
        })
    }

    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&'a Value> {
        let (root, rest) = match path.split_once('.') {
            Some((root, rest)) => (root, Some(rest)),
            None => (path, None),
        };
        let Some((i, is_index)) = self.frame_for(root) else {
            return self.bag.resolve(path);
        };
        let frame = &self.frames[i];
        if is_index {
            return if rest.is_none() { Some(&frame.position_value) } else { None };
        }
        let mut current = &frame.value;
        if let Some(rest) = rest {
            for segment in rest.split('.') {
                current = current.as_object()?.get(segment)?;
            }
        }
        Some(current)
    }
}

pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluate a tag test; `statement` only labels errors
    pub fn evaluate(test: &Test, bindings: &Bindings<'_>, statement: &str) -> Result<bool> {
        let lookup = |property: &str| bindings.resolve(property).filter(|v| !v.is_null());
        Ok(match test {
            Test::Expression(expr) => {
                let parsed = expr.parsed().map_err(|reason| MapperError::InvalidExpression {
                    statement: statement.to_string(),
                    expression: expr.source().to_string(),
                    reason: reason.to_string(),
                })?;
                Self::eval(parsed, bindings).is_truthy()
            }
            Test::IsNull(p) => lookup(p).is_none(),
            Test::IsNotNull(p) => lookup(p).is_some(),
            Test::IsEmpty(p) => lookup(p).is_none_or(Value::is_empty),
            Test::IsNotEmpty(p) => lookup(p).is_some_and(|v| !v.is_empty()),
            Test::IsTrue(p) => Self::as_bool(lookup(p)) == Some(true),
            Test::IsFalse(p) => Self::as_bool(lookup(p)) == Some(false),
            Test::IsProperty(p) => bindings.resolve(p).is_some(),
            Test::IsEqual { property, compare_value } => {
                lookup(property).is_some_and(|v| v.to_string() == *compare_value)
            }
            Test::IsNotEqual { property, compare_value } => {
                !lookup(property).is_some_and(|v| v.to_string() == *compare_value)
            }
            Test::IsGreaterThan { property, compare_value } => {
                Self::compare_numeric(lookup(property), compare_value, statement)? == Some(Ordering::Greater)
            }
            Test::IsLessThan { property, compare_value } => {
                Self::compare_numeric(lookup(property), compare_value, statement)? == Some(Ordering::Less)
            }
        })
    }

    fn as_bool(value: Option<&Value>) -> Option<bool> {
        value
            .cloned()
            .and_then(|v| v.coerce(ValueKind::Boolean).ok())
            .and_then(|v| v.as_bool())
    }

    fn compare_numeric(value: Option<&Value>, compare_value: &str, statement: &str) -> Result<Option<Ordering>> {
        let threshold = Decimal::from_str(compare_value.trim()).map_err(|e| MapperError::InvalidExpression {
            statement: statement.to_string(),
            expression: compare_value.to_string(),
            reason: e.to_string(),
        })?;
        Ok(value
            .cloned()
            .and_then(|v| v.coerce(ValueKind::Numeric).ok())
            .and_then(|v| match v {
                Value::Numeric(d) => Some(d.cmp(&threshold)),
                _ => None,
            }))
    }

    /// Evaluate a parsed expression to a value
    #[must_use]
    pub fn eval(expr: &Expr, bindings: &Bindings<'_>) -> Value {
        match expr {
            Expr::Literal(v) => v.clone(),
            Expr::Path(path) => bindings.resolve(path).cloned().unwrap_or(Value::Null),
            Expr::Not(inner) => Value::Boolean(!Self::eval(inner, bindings).is_truthy()),
            Expr::And(left, right) => Value::Boolean(
                Self::eval(left, bindings).is_truthy() && Self::eval(right, bindings).is_truthy(),
            ),
            Expr::Or(left, right) => Value::Boolean(
                Self::eval(left, bindings).is_truthy() || Self::eval(right, bindings).is_truthy(),
            ),
            Expr::Compare(left, op, right) => {
                let left = Self::eval(left, bindings);
                let right = Self::eval(right, bindings);
                Value::Boolean(Self::compare(&left, *op, &right))
            }
        }
    }

    fn compare(left: &Value, op: CompareOp, right: &Value) -> bool {
        match op {
            CompareOp::Eq => Self::loose_eq(left, right),
            CompareOp::NotEq => !Self::loose_eq(left, right),
            CompareOp::Gt => Self::order(left, right) == Some(Ordering::Greater),
            CompareOp::Lt => Self::order(left, right) == Some(Ordering::Less),
            CompareOp::Ge => matches!(Self::order(left, right), Some(Ordering::Greater | Ordering::Equal)),
            CompareOp::Le => matches!(Self::order(left, right), Some(Ordering::Less | Ordering::Equal)),
        }
    }

    /// NULL equals only NULL; numbers compare across representations
    fn loose_eq(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Text(x), y) | (y, Value::Text(x)) if !matches!(y, Value::Text(_)) => {
                *x == y.to_string()
            }
            _ => Self::order(a, b).map_or(a == b, |o| o == Ordering::Equal),
        }
    }

    /// Ordering of comparable values; `None` for NULL or mismatched kinds
    fn order(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
            (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
            (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
            (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
            (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
            (Value::TimestampTz(x), Value::TimestampTz(y)) => Some(x.cmp(y)),
            (Value::Uuid(x), Value::Uuid(y)) => Some(x.cmp(y)),
            // Cross-type numeric comparisons
            (Value::Integer(_) | Value::Real(_) | Value::Numeric(_), Value::Integer(_) | Value::Real(_) | Value::Numeric(_)) => {
                Self::numeric(a)?.partial_cmp(&Self::numeric(b)?)
            }
            _ => None,
        }
    }

    fn numeric(v: &Value) -> Option<f64> {
        match v.clone().coerce(ValueKind::Real) {
            Ok(Value::Real(r)) => Some(r),
            _ => None,
        }
    }
}
