//! Backend-agnostic predicate tree
//!
//! Builders produce a `Predicate`; each executor translates it into its own
//! native form (SQL text, in-memory evaluation).

use serde::Serialize;
use std::cmp::Ordering;
use type_mapping::{FieldValue, RowAccessor};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOp {
    Eq,        // =
    Ne,        // !=
    Gt,        // >
    Gte,       // >=
    Lt,        // <
    Lte,       // <=
    In,        // IN
    Contains,  // LIKE %v%
    IContains, // ILIKE %v%
    IExact,    // case-insensitive equality
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Value(FieldValue),
    List(Vec<FieldValue>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub field: String,
    pub op: ComparisonOp,
    pub operand: Operand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Comparison(Comparison),
    /// Empty `And` matches every row
    And(Vec<Predicate>),
    /// Empty `Or` matches no row
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(field: &str, op: ComparisonOp, value: impl Into<FieldValue>) -> Self {
        Self::Comparison(Comparison {
            field: field.to_string(),
            op,
            operand: Operand::Value(value.into()),
        })
    }

    pub fn eq(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, ComparisonOp::Eq, value)
    }

    pub fn lt(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, ComparisonOp::Lt, value)
    }

    pub fn gt(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::compare(field, ComparisonOp::Gt, value)
    }

    pub fn in_values(field: &str, values: Vec<FieldValue>) -> Self {
        Self::Comparison(Comparison {
            field: field.to_string(),
            op: ComparisonOp::In,
            operand: Operand::List(values),
        })
    }

    pub fn and(children: Vec<Predicate>) -> Self {
        Self::And(children)
    }

    pub fn or(children: Vec<Predicate>) -> Self {
        Self::Or(children)
    }

    pub fn match_all() -> Self {
        Self::And(Vec::new())
    }

    pub fn match_none() -> Self {
        Self::Or(Vec::new())
    }

    /// True for an `Or` with no children
    pub fn is_match_none(&self) -> bool {
        matches!(self, Predicate::Or(children) if children.is_empty())
    }

    /// Conjunction of two predicates, without nesting when `self` is already an `And`
    pub fn and_also(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut children) => {
                children.push(other);
                Predicate::And(children)
            }
            first => Predicate::And(vec![first, other]),
        }
    }

    /// Every field name the tree refers to, in tree order (with repeats)
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Predicate::Comparison(comparison) => vec![comparison.field.as_str()],
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().flat_map(|c| c.fields()).collect()
            }
        }
    }

    /// Evaluate against a row. Follows SQL semantics: a comparison involving a
    /// missing or null value is false, except `= NULL` / `!= NULL` which test
    /// for null-ness.
    pub fn matches<R: RowAccessor + ?Sized>(&self, row: &R) -> bool {
        match self {
            Predicate::Comparison(comparison) => comparison.matches(row),
            Predicate::And(children) => children.iter().all(|c| c.matches(row)),
            Predicate::Or(children) => children.iter().any(|c| c.matches(row)),
        }
    }
}

impl Comparison {
    fn matches<R: RowAccessor + ?Sized>(&self, row: &R) -> bool {
        let actual = row.get_field(&self.field).unwrap_or(&FieldValue::Null);

        match (&self.op, &self.operand) {
            (ComparisonOp::Eq, Operand::Value(FieldValue::Null)) => actual.is_null(),
            (ComparisonOp::Ne, Operand::Value(FieldValue::Null)) => !actual.is_null(),
            (ComparisonOp::In, Operand::List(values)) => values
                .iter()
                .any(|v| actual.compare(v) == Some(Ordering::Equal)),
            (ComparisonOp::Contains, Operand::Value(needle)) => {
                text_of(actual).is_some_and(|hay| hay.contains(&needle.to_string()))
            }
            (ComparisonOp::IContains, Operand::Value(needle)) => text_of(actual)
                .is_some_and(|hay| hay.to_lowercase().contains(&needle.to_string().to_lowercase())),
            (ComparisonOp::IExact, Operand::Value(other)) => text_of(actual)
                .is_some_and(|hay| hay.to_lowercase() == other.to_string().to_lowercase()),
            (op, Operand::Value(expected)) => match actual.compare(expected) {
                Some(ordering) => match op {
                    ComparisonOp::Eq => ordering == Ordering::Equal,
                    ComparisonOp::Ne => ordering != Ordering::Equal,
                    ComparisonOp::Gt => ordering == Ordering::Greater,
                    ComparisonOp::Gte => ordering != Ordering::Less,
                    ComparisonOp::Lt => ordering == Ordering::Less,
                    ComparisonOp::Lte => ordering != Ordering::Greater,
                    _ => false,
                },
                None => false,
            },
            (_, Operand::List(_)) => false,
        }
    }
}

// Pattern operators see a column through its text form, as `CAST(col AS TEXT)` does
fn text_of(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Null => None,
        other => Some(other.to_string()),
    }
}
