use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unknown field '{field}' on {collection}")]
    UnknownField { collection: String, field: String },

    #[error("Unknown filter operator '{operator}' on field '{field}'")]
    UnknownOperator { field: String, operator: String },

    #[error("Invalid filter value for field '{field}': {reason}")]
    InvalidFilterValue { field: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Query failed on {context}: {error}")]
    Execution {
        context: String,
        #[source]
        error: sqlx::Error,
    },

    #[error("No value bound for query parameter ':{0}'")]
    MissingParameter(String),

    #[error("Cannot decode column '{column}': {reason}")]
    Decode { column: String, reason: String },
}

impl StoreError {
    pub fn unknown_field(collection: &str, field: &str) -> Self {
        Self::UnknownField {
            collection: collection.to_string(),
            field: field.to_string(),
        }
    }

    pub fn invalid_value(field: &str, reason: impl ToString) -> Self {
        Self::InvalidFilterValue {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn execution(context: &str, error: sqlx::Error) -> Self {
        Self::Execution {
            context: context.to_string(),
            error,
        }
    }
}
