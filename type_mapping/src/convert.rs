//! Conversion of raw inputs into typed field values
//!
//! Two entry points: text (cursors, search terms) and JSON (filter operands).
//! Both are driven by the declared `FieldType`, never by guessing from the input.

use crate::field_type::FieldType;
use crate::types::FieldValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Fixed absolute timestamp format (six fractional digits)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
/// Fixed absolute timestamp format for timezone-aware fields
pub const TIMESTAMP_TZ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f%:z";
/// Used instead when a value has sub-microsecond precision
pub const TIMESTAMP_NANOS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";
pub const TIMESTAMP_TZ_NANOS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f%:z";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// Parsing accepts any number of fractional digits, including none
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const TIMESTAMP_TZ_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%:z";
const ISO_TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("cannot parse '{raw}' as {field_type:?}")]
    Unparseable { field_type: FieldType, raw: String },

    #[error("a JSON {found} cannot be used as {field_type:?}")]
    Incompatible {
        field_type: FieldType,
        found: &'static str,
    },

    #[error("{raw} is out of range for {field_type:?}")]
    OutOfRange { field_type: FieldType, raw: String },
}

impl FieldValue {
    /// Parse the text form of a value as the given field type
    pub fn parse_as(field_type: FieldType, raw: &str) -> Result<FieldValue, ValueError> {
        let unparseable = || ValueError::Unparseable {
            field_type,
            raw: raw.to_string(),
        };

        let value = match field_type {
            FieldType::Char | FieldType::Text => FieldValue::Text(raw.to_string()),
            FieldType::SmallInt => FieldValue::SmallInt(i16::from_str(raw).map_err(|_| unparseable())?),
            FieldType::Int => FieldValue::Integer(i32::from_str(raw).map_err(|_| unparseable())?),
            FieldType::BigInt => FieldValue::BigInt(i64::from_str(raw).map_err(|_| unparseable())?),
            FieldType::Float => {
                let f = f64::from_str(raw).map_err(|_| unparseable())?;
                if !f.is_finite() {
                    return Err(unparseable());
                }
                FieldValue::Float(f)
            }
            FieldType::Decimal => FieldValue::Decimal(Decimal::from_str(raw).map_err(|_| unparseable())?),
            FieldType::Uuid => FieldValue::Uuid(Uuid::parse_str(raw).map_err(|_| unparseable())?),
            FieldType::Boolean => match raw {
                "true" => FieldValue::Boolean(true),
                "false" => FieldValue::Boolean(false),
                _ => return Err(unparseable()),
            },
            FieldType::Date => {
                FieldValue::Date(NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| unparseable())?)
            }
            FieldType::Timestamp => FieldValue::Timestamp(
                NaiveDateTime::parse_from_str(raw, TIMESTAMP_PARSE_FORMAT).map_err(|_| unparseable())?,
            ),
            FieldType::TimestampTz => FieldValue::TimestampTz(
                DateTime::parse_from_str(raw, TIMESTAMP_TZ_PARSE_FORMAT).map_err(|_| unparseable())?,
            ),
            FieldType::Json => FieldValue::Json(serde_json::from_str(raw).map_err(|_| unparseable())?),
        };

        Ok(value)
    }

    /// Coerce a JSON operand (as received from an API filter) to the given field type
    pub fn from_json(field_type: FieldType, value: &serde_json::Value) -> Result<FieldValue, ValueError> {
        use serde_json::Value;

        let incompatible = |found| ValueError::Incompatible { field_type, found };
        let out_of_range = |raw: String| ValueError::OutOfRange { field_type, raw };

        match (field_type, value) {
            (_, Value::Null) => Ok(FieldValue::Null),
            (FieldType::Json, other) => Ok(FieldValue::Json(other.clone())),
            (_, Value::Array(_)) => Err(incompatible("array")),
            (_, Value::Object(_)) => Err(incompatible("object")),

            (FieldType::Char | FieldType::Text, Value::String(s)) => Ok(FieldValue::Text(s.clone())),
            (FieldType::Char | FieldType::Text, Value::Number(_)) => Err(incompatible("number")),
            (FieldType::Char | FieldType::Text, Value::Bool(_)) => Err(incompatible("boolean")),

            (FieldType::SmallInt | FieldType::Int | FieldType::BigInt, Value::Number(n)) => {
                let i = n.as_i64().ok_or_else(|| out_of_range(n.to_string()))?;
                narrow_integer(field_type, i).ok_or_else(|| out_of_range(n.to_string()))
            }
            (FieldType::Float, Value::Number(n)) => n
                .as_f64()
                .map(FieldValue::Float)
                .ok_or_else(|| out_of_range(n.to_string())),
            (FieldType::Decimal, Value::Number(n)) => Self::parse_as(field_type, &n.to_string()),

            (FieldType::Boolean, Value::Bool(b)) => Ok(FieldValue::Boolean(*b)),

            (FieldType::Timestamp, Value::String(s)) => parse_naive_timestamp(s)
                .map(FieldValue::Timestamp)
                .ok_or_else(|| ValueError::Unparseable {
                    field_type,
                    raw: s.clone(),
                }),
            (FieldType::TimestampTz, Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(FieldValue::TimestampTz)
                .or_else(|_| Self::parse_as(field_type, s)),

            // Numeric, UUID, boolean and date fields also accept their text form
            (_, Value::String(s)) => Self::parse_as(field_type, s),
            (_, Value::Number(_)) => Err(incompatible("number")),
            (_, Value::Bool(_)) => Err(incompatible("boolean")),
        }
    }
}

fn narrow_integer(field_type: FieldType, i: i64) -> Option<FieldValue> {
    match field_type {
        FieldType::SmallInt => i16::try_from(i).ok().map(FieldValue::SmallInt),
        FieldType::Int => i32::try_from(i).ok().map(FieldValue::Integer),
        _ => Some(FieldValue::BigInt(i)),
    }
}

fn parse_naive_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_PARSE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, ISO_TIMESTAMP_PARSE_FORMAT))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
}
