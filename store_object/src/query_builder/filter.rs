//! Filter expressions and their translation into predicates
//!
//! A filter expression maps field names to either an operator map
//! (`{"gte": 2, "lt": 500}`) or a bare value, which means equality. Field
//! names may be given in camelCase. All fragments combine with AND.

use crate::errors::StoreError;
use crate::query_builder::predicate::{ComparisonOp, Predicate};
use crate::schema::{FieldDescriptor, SchemaDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use type_mapping::FieldValue;

/// Operators accepted in filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    Contains,
    IContains,
    Matches,
}

impl FilterOperator {
    fn comparison(self) -> ComparisonOp {
        match self {
            FilterOperator::Eq => ComparisonOp::Eq,
            FilterOperator::Neq => ComparisonOp::Ne,
            FilterOperator::Gt => ComparisonOp::Gt,
            FilterOperator::Lt => ComparisonOp::Lt,
            FilterOperator::Gte => ComparisonOp::Gte,
            FilterOperator::Lte => ComparisonOp::Lte,
            FilterOperator::In => ComparisonOp::In,
            FilterOperator::Contains => ComparisonOp::Contains,
            FilterOperator::IContains => ComparisonOp::IContains,
            FilterOperator::Matches => ComparisonOp::IExact,
        }
    }
}

impl FromStr for FilterOperator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "eq" => FilterOperator::Eq,
            "neq" => FilterOperator::Neq,
            "gt" => FilterOperator::Gt,
            "lt" => FilterOperator::Lt,
            "gte" => FilterOperator::Gte,
            "lte" => FilterOperator::Lte,
            "in" => FilterOperator::In,
            "contains" => FilterOperator::Contains,
            "icontains" => FilterOperator::IContains,
            "matches" => FilterOperator::Matches,
            _ => return Err(()),
        })
    }
}

/// What one field of a filter expression asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldFilter {
    Operators(BTreeMap<String, Value>),
    Equals(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterExpression(BTreeMap<String, FieldFilter>);

impl FilterExpression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON object an API caller sent
    pub fn from_json(value: Value) -> Result<Self, StoreError> {
        serde_json::from_value(value).map_err(|e| StoreError::invalid_value("filter", e))
    }

    /// Add `field <operator> value`
    pub fn op(mut self, field: &str, operator: &str, value: Value) -> Self {
        let entry = self
            .0
            .entry(field.to_string())
            .or_insert_with(|| FieldFilter::Operators(BTreeMap::new()));
        match entry {
            FieldFilter::Operators(ops) => {
                ops.insert(operator.to_string(), value);
            }
            FieldFilter::Equals(existing) => {
                let mut ops = BTreeMap::new();
                ops.insert("eq".to_string(), existing.clone());
                ops.insert(operator.to_string(), value);
                *entry = FieldFilter::Operators(ops);
            }
        }
        self
    }

    /// Add a bare equality entry
    pub fn equals(mut self, field: &str, value: Value) -> Self {
        self.0.insert(field.to_string(), FieldFilter::Equals(value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldFilter)> {
        self.0.iter()
    }
}

/// Translates filter expressions into predicates against a schema
pub struct PredicateBuilder;

impl PredicateBuilder {
    pub fn build(schema: &SchemaDescriptor, filter: &FilterExpression) -> Result<Predicate, StoreError> {
        let mut fragments = Vec::new();

        for (name, field_filter) in filter.iter() {
            let field = schema.require_field(name)?;

            match field_filter {
                FieldFilter::Equals(value) => {
                    fragments.push(Self::fragment(field, FilterOperator::Eq, value)?);
                }
                FieldFilter::Operators(ops) => {
                    for (operator, value) in ops {
                        let operator = operator.parse::<FilterOperator>().map_err(|_| {
                            StoreError::UnknownOperator {
                                field: name.clone(),
                                operator: operator.clone(),
                            }
                        })?;
                        fragments.push(Self::fragment(field, operator, value)?);
                    }
                }
            }
        }

        Ok(Predicate::and(fragments))
    }

    fn fragment(field: &FieldDescriptor, operator: FilterOperator, value: &Value) -> Result<Predicate, StoreError> {
        let name = field.name();

        match operator {
            FilterOperator::In => {
                let items = value
                    .as_array()
                    .ok_or_else(|| StoreError::invalid_value(name, "'in' expects a list"))?;
                let values = items
                    .iter()
                    .map(|item| coerce(field, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Predicate::in_values(name, values))
            }
            FilterOperator::Contains | FilterOperator::IContains | FilterOperator::Matches => {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => {
                        return Err(StoreError::invalid_value(
                            name,
                            "pattern operators expect a string",
                        ))
                    }
                };
                Ok(Predicate::compare(name, operator.comparison(), FieldValue::Text(text)))
            }
            _ => Ok(Predicate::compare(name, operator.comparison(), coerce(field, value)?)),
        }
    }
}

fn coerce(field: &FieldDescriptor, value: &Value) -> Result<FieldValue, StoreError> {
    FieldValue::from_json(field.field_type(), value)
        .map_err(|e| StoreError::invalid_value(field.name(), e))
}
