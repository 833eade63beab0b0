//! Declared field types
//!
//! Schema descriptors declare one of these per column. The type drives cursor
//! decoding, filter operand coercion and search eligibility.

use serde::{Deserialize, Serialize};

/// Column type as declared by a schema descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Char,
    Text,
    SmallInt,
    Int,
    BigInt,
    Float,
    Decimal,
    Uuid,
    Boolean,
    Date,
    Timestamp,
    TimestampTz,
    Json,
}

impl FieldType {
    /// Character columns accept any search term
    pub fn is_string_like(&self) -> bool {
        matches!(self, FieldType::Char | FieldType::Text)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, FieldType::SmallInt | FieldType::Int | FieldType::BigInt)
    }

    pub fn is_fractional(&self) -> bool {
        matches!(self, FieldType::Float | FieldType::Decimal)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            FieldType::Date | FieldType::Timestamp | FieldType::TimestampTz
        )
    }

    /// PostgreSQL type name, used in casts and diagnostics
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldType::Char => "VARCHAR",
            FieldType::Text => "TEXT",
            FieldType::SmallInt => "SMALLINT",
            FieldType::Int => "INTEGER",
            FieldType::BigInt => "BIGINT",
            FieldType::Float => "DOUBLE PRECISION",
            FieldType::Decimal => "NUMERIC",
            FieldType::Uuid => "UUID",
            FieldType::Boolean => "BOOLEAN",
            FieldType::Date => "DATE",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::TimestampTz => "TIMESTAMP WITH TIME ZONE",
            FieldType::Json => "JSONB",
        }
    }
}

/// Declared constraints on a column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConstraints {
    /// Maximum length in characters (VARCHAR(n))
    pub max_length: Option<usize>,
    pub nullable: bool,
}

impl FieldConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Whether a value of `len` characters can be stored in this column
    pub fn admits_length(&self, len: usize) -> bool {
        self.max_length.is_none_or(|max| len <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_groups() {
        assert!(FieldType::Char.is_string_like());
        assert!(FieldType::Text.is_string_like());
        assert!(!FieldType::Uuid.is_string_like());
        assert!(FieldType::SmallInt.is_integer());
        assert!(!FieldType::Decimal.is_integer());
        assert!(FieldType::Float.is_fractional());
        assert!(FieldType::TimestampTz.is_temporal());
    }

    #[test]
    fn test_max_length_admits() {
        let constraints = FieldConstraints::new().with_max_length(5);
        assert!(constraints.admits_length(5));
        assert!(!constraints.admits_length(6));
        assert!(FieldConstraints::new().admits_length(10_000));
    }

    #[test]
    fn test_field_type_serde_names() {
        let json = serde_json::to_string(&FieldType::TimestampTz).unwrap();
        assert_eq!(json, "\"timestamp_tz\"");
    }
}
