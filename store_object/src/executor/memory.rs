//! In-process executor over a fixed set of rows

use super::structured::combined_predicate;
use super::{check_fields, FetchRequest, QueryExecutor};
use crate::errors::StoreError;
use crate::schema::SchemaDescriptor;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;
use type_mapping::{FieldValue, Row, RowAccessor};

/// Evaluates predicates directly over rows, with the ordering and limit
/// semantics of the SQL executors (NULLs sort as larger than any value).
#[derive(Debug, Clone)]
pub struct MemoryExecutor {
    schema: Arc<SchemaDescriptor>,
    rows: Arc<Vec<Row>>,
    executions: Arc<AtomicUsize>,
}

impl MemoryExecutor {
    pub fn new(schema: Arc<SchemaDescriptor>, rows: Vec<Row>) -> Self {
        Self {
            schema,
            rows: Arc::new(rows),
            executions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// How many times `execute` has run, across clones
    pub fn executions(&self) -> usize {
        self.executions.load(AtomicOrdering::SeqCst)
    }
}

fn sort_key_order(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.compare(y).unwrap_or(Ordering::Equal),
    }
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    fn source(&self) -> String {
        format!("memory:{}", self.schema.collection())
    }

    async fn execute(&self, request: &FetchRequest) -> Result<Vec<Row>, StoreError> {
        self.executions.fetch_add(1, AtomicOrdering::SeqCst);
        check_fields(&self.schema, request)?;
        let predicate = combined_predicate(&self.schema, request)?;

        let mut matched: Vec<Row> = self
            .rows
            .iter()
            .filter(|row| predicate.as_ref().is_none_or(|p| p.matches(*row)))
            .cloned()
            .collect();

        let field = request.order_field.as_str();
        matched.sort_by(|a, b| {
            let ordering = sort_key_order(a.get_field(field), b.get_field(field));
            if request.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        matched.truncate(usize::try_from(request.limit.max(0)).unwrap_or(usize::MAX));
        Ok(matched)
    }
}
