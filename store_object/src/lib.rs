//! Store Object - query layer for relayhaus
//!
//! Schema descriptors, the predicate tree with its filter and search
//! builders, SQL generation, and the executors that fetch rows for the
//! paginator.

pub mod errors;
pub mod executor;
pub mod prelude;
pub mod query_builder;
pub mod schema;
pub mod validation;

pub use errors::StoreError;
pub use executor::{FetchRequest, MemoryExecutor, QueryExecutor, RawQueryExecutor, StructuredExecutor};
pub use query_builder::{
    ComparisonOp, FieldFilter, FilterExpression, FilterOperator, Predicate, PredicateBuilder,
    SearchPredicateBuilder, SqlGenerator,
};
pub use schema::{FieldDescriptor, SchemaBuilder, SchemaDescriptor};
pub use validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

use sqlx::PgPool;

pub type DbPool = PgPool;
