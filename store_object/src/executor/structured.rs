//! Structured queries against a schema's table
//!
//! Selects exactly the declared columns. Request parameters are equality
//! conditions on declared fields, ANDed with the predicate.

use super::binding::{bind_value, decode_row};
use super::{check_fields, FetchRequest, QueryExecutor};
use crate::errors::StoreError;
use crate::query_builder::{Predicate, SqlGenerator};
use crate::schema::SchemaDescriptor;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use type_mapping::{FieldValue, Row};

#[derive(Debug, Clone)]
pub struct StructuredExecutor {
    pool: PgPool,
    schema: Arc<SchemaDescriptor>,
}

impl StructuredExecutor {
    pub fn new(pool: PgPool, schema: Arc<SchemaDescriptor>) -> Self {
        Self { pool, schema }
    }

    pub fn build_sql(&self, request: &FetchRequest) -> Result<(String, Vec<FieldValue>), StoreError> {
        let table = self.schema.table().ok_or_else(|| {
            StoreError::Schema(format!("{} declares no table", self.schema.collection()))
        })?;
        check_fields(&self.schema, request)?;

        let predicate = combined_predicate(&self.schema, request)?;
        let (where_clause, values) = SqlGenerator::build_where_clause(predicate.as_ref(), 1);

        let columns: Vec<&str> = self.schema.fields().map(|f| f.name()).collect();
        let sql = format!(
            "SELECT {} FROM {}{}{}{}",
            columns.join(", "),
            table,
            where_clause,
            SqlGenerator::build_order_clause(&request.order_field, request.descending),
            SqlGenerator::build_limit_clause(request.limit),
        );

        Ok((sql, values))
    }
}

/// Request parameters as equality conditions, ANDed in front of the predicate
pub(crate) fn combined_predicate(
    schema: &SchemaDescriptor,
    request: &FetchRequest,
) -> Result<Option<Predicate>, StoreError> {
    let mut conditions = Vec::with_capacity(request.params.len() + 1);
    for (name, value) in &request.params {
        let field = schema.require_field(name)?;
        conditions.push(Predicate::eq(field.name(), value.clone()));
    }

    Ok(match (conditions.is_empty(), &request.predicate) {
        (true, predicate) => predicate.clone(),
        (false, Some(predicate)) => {
            conditions.push(predicate.clone());
            Some(Predicate::and(conditions))
        }
        (false, None) => Some(Predicate::and(conditions)),
    })
}

#[async_trait]
impl QueryExecutor for StructuredExecutor {
    fn source(&self) -> String {
        match self.schema.table() {
            Some(table) => format!("table:{}", table),
            None => format!("table:{}", self.schema.collection()),
        }
    }

    async fn execute(&self, request: &FetchRequest) -> Result<Vec<Row>, StoreError> {
        let (sql, values) = self.build_sql(request)?;
        tracing::debug!(collection = self.schema.collection(), sql = %sql, "executing structured query");

        let mut query = sqlx::query(&sql);
        for value in values {
            query = bind_value(query, value);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::execution(self.schema.collection(), e))?;

        rows.iter().map(|row| decode_row(row, &self.schema)).collect()
    }
}
