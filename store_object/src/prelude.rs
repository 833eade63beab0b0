//! Convenience re-exports for common store-object usage

// Schema
pub use crate::schema::{FieldDescriptor, SchemaDescriptor};

// Error types
pub use crate::errors::StoreError;

// Predicates and their builders
pub use crate::query_builder::{FilterExpression, Predicate, PredicateBuilder, SearchPredicateBuilder};

// Execution
pub use crate::executor::{FetchRequest, MemoryExecutor, QueryExecutor, RawQueryExecutor, StructuredExecutor};

// Validation
pub use crate::validation::{ValidatedFieldName, ValidatedTableName, ValidationError};

// Value types shared with the rest of the workspace
pub use type_mapping::{FieldConstraints, FieldType, FieldValue, Row, RowAccessor};

// Common external dependencies that are frequently used
pub use async_trait::async_trait;
pub use sqlx::PgPool;
pub use uuid::Uuid;
