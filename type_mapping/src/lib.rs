//! Unified type mapping between declared schema field types and runtime values
//! This crate provides consistent value handling used across the relayhaus ecosystem

pub mod convert;
pub mod field_type;
pub mod row;
pub mod types;

pub use convert::{
    ValueError, DATE_FORMAT, TIMESTAMP_FORMAT, TIMESTAMP_NANOS_FORMAT, TIMESTAMP_TZ_FORMAT,
    TIMESTAMP_TZ_NANOS_FORMAT,
};
pub use field_type::{FieldConstraints, FieldType};
pub use row::{Row, RowAccessor};
pub use types::FieldValue;
