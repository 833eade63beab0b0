//! Row representation and field access

use crate::types::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Uniform read access to a named field, implemented once per row representation
pub trait RowAccessor {
    fn get_field(&self, field: &str) -> Option<&FieldValue>;
}

/// A fetched row: column name to typed value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, FieldValue>);

impl Row {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    pub fn with(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.0.insert(column.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, column: String, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(column, value)
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.0.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Plain JSON object, handy for formatters
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    pub fn into_inner(self) -> BTreeMap<String, FieldValue> {
        self.0
    }
}

impl FromIterator<(String, FieldValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl RowAccessor for Row {
    fn get_field(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }
}

impl RowAccessor for BTreeMap<String, FieldValue> {
    fn get_field(&self, field: &str) -> Option<&FieldValue> {
        self.get(field)
    }
}

impl RowAccessor for HashMap<String, FieldValue> {
    fn get_field(&self, field: &str) -> Option<&FieldValue> {
        self.get(field)
    }
}
