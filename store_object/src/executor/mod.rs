//! Query execution
//!
//! Every data source the paginator can read from implements [`QueryExecutor`]:
//! fetch at most `limit` rows matching a predicate, ordered by one field.

mod binding;
pub mod memory;
pub mod raw;
pub mod structured;

use crate::errors::StoreError;
use crate::query_builder::Predicate;
use crate::schema::SchemaDescriptor;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use type_mapping::{FieldValue, Row};

pub use memory::MemoryExecutor;
pub use raw::RawQueryExecutor;
pub use structured::StructuredExecutor;

/// One fetch. Serializable so it can take part in cache keys.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchRequest {
    pub predicate: Option<Predicate>,
    pub order_field: String,
    pub descending: bool,
    pub limit: i64,
    /// Named parameters: raw-query placeholders, or equality
    /// conditions for executors without query text
    pub params: BTreeMap<String, FieldValue>,
}

impl FetchRequest {
    /// Descending on `order_field`, unfiltered
    pub fn new(order_field: &str, limit: i64) -> Self {
        Self {
            predicate: None,
            order_field: order_field.to_string(),
            descending: true,
            limit,
            params: BTreeMap::new(),
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn ascending(mut self) -> Self {
        self.descending = false;
        self
    }

    pub fn with_param(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn with_params(mut self, params: BTreeMap<String, FieldValue>) -> Self {
        self.params.extend(params);
        self
    }
}

/// Field names are spliced into SQL text, so every name a request carries
/// must be one the schema declares
pub(crate) fn check_fields(schema: &SchemaDescriptor, request: &FetchRequest) -> Result<(), StoreError> {
    let predicate_fields = request.predicate.iter().flat_map(|p| p.fields());

    for name in std::iter::once(request.order_field.as_str()).chain(predicate_fields) {
        if schema.field(name).is_none() {
            return Err(StoreError::unknown_field(schema.collection(), name));
        }
    }
    Ok(())
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Stable description of what this executor reads from. Two executors
    /// with the same source must return the same rows for the same request.
    fn source(&self) -> String;

    async fn execute(&self, request: &FetchRequest) -> Result<Vec<Row>, StoreError>;
}
