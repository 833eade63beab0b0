//! Opaque pagination cursors
//!
//! Wire format: `base64(collection + ":" + value)`, standard alphabet with
//! padding. The value is the canonical text form of the pagination field, so
//! cursors stay valid across releases as long as that form does.

use crate::errors::CursorError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use type_mapping::{FieldType, FieldValue, RowAccessor};

pub struct CursorCodec;

impl CursorCodec {
    pub fn encode(collection: &str, value: &FieldValue) -> String {
        STANDARD.encode(format!("{}:{}", collection, value))
    }

    /// Cursor for a row, from its value in `field` (NULL when absent)
    pub fn encode_row<R: RowAccessor + ?Sized>(collection: &str, row: &R, field: &str) -> String {
        Self::encode(collection, row.get_field(field).unwrap_or(&FieldValue::Null))
    }

    /// Recover the typed field value. Text fields take the payload verbatim;
    /// every other type must parse as that type or the cursor is rejected.
    pub fn decode(cursor: &str, collection: &str, field_type: FieldType) -> Result<FieldValue, CursorError> {
        let bytes = STANDARD.decode(cursor).map_err(|_| CursorError::Encoding)?;
        let payload = String::from_utf8(bytes).map_err(|_| CursorError::Utf8)?;

        let (found, raw) = payload
            .split_once(':')
            .ok_or(CursorError::MissingSeparator)?;

        if found != collection {
            return Err(CursorError::CollectionMismatch {
                expected: collection.to_string(),
                found: found.to_string(),
            });
        }

        Ok(FieldValue::parse_as(field_type, raw)?)
    }
}
