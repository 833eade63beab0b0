//! Runtime field values
//!
//! `FieldValue` is what rows carry, what predicates compare against and what
//! gets bound into queries. It serializes with an explicit type tag so that a
//! round trip through the cache yields the same typed value, not a string.

use crate::convert::{
    DATE_FORMAT, TIMESTAMP_FORMAT, TIMESTAMP_NANOS_FORMAT, TIMESTAMP_TZ_FORMAT, TIMESTAMP_TZ_NANOS_FORMAT,
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Boolean(bool),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Float(#[serde(with = "float_repr")] f64),
    Decimal(Decimal), // serialized as a string to keep scale and precision
    Uuid(Uuid),
    Text(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    Json(serde_json::Value),
}

/// Non-finite floats go out as the strings `NaN`, `inf` and `-inf`, which
/// plain JSON numbers cannot carry
mod float_repr {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid float '{}'", other))),
            },
        }
    }
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Integer view across all integer widths
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::SmallInt(v) => Some(i64::from(*v)),
            FieldValue::Integer(v) => Some(i64::from(*v)),
            FieldValue::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    fn as_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Decimal(d) => Some(*d),
            FieldValue::Float(f) => Decimal::from_f64(*f),
            other => other.as_i64().map(Decimal::from),
        }
    }

    /// Ordering between two values, `None` when they are not comparable.
    ///
    /// Integers of different widths compare numerically, and integers compare
    /// against floats and decimals. Null is never comparable.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        use FieldValue::*;
        match (self, other) {
            (Null, _) | (_, Null) => None,
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Uuid(a), Uuid(b)) => Some(a.cmp(b)),
            (Text(a), Text(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Timestamp(a), Timestamp(b)) => Some(a.cmp(b)),
            (TimestampTz(a), TimestampTz(b)) => Some(a.cmp(b)),
            (Json(a), Json(b)) => (a == b).then_some(Ordering::Equal),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Float(a), b) if b.as_i64().is_some() => a.partial_cmp(&(b.as_i64()? as f64)),
            (a, Float(b)) if a.as_i64().is_some() => (a.as_i64()? as f64).partial_cmp(b),
            (a, b) => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => Some(a.as_decimal()?.cmp(&b.as_decimal()?)),
            },
        }
    }

    /// Plain JSON rendering for formatters and API payloads
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::SmallInt(v) => Value::from(*v),
            FieldValue::Integer(v) => Value::from(*v),
            FieldValue::BigInt(v) => Value::from(*v),
            FieldValue::Float(v) => Value::from(*v),
            FieldValue::Decimal(d) => d
                .to_f64()
                .map(Value::from)
                .unwrap_or_else(|| Value::String(d.to_string())),
            FieldValue::Uuid(u) => Value::String(u.to_string()),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
            FieldValue::Timestamp(ts) => Value::String(ts.and_utc().to_rfc3339()),
            FieldValue::TimestampTz(ts) => Value::String(ts.to_rfc3339()),
            FieldValue::Json(v) => v.clone(),
        }
    }
}

fn has_sub_micros(nanos: u32) -> bool {
    nanos % 1_000 != 0
}

/// Canonical text form; this is the form embedded in pagination cursors.
/// Timestamps get six fractional digits, or nine when the value carries
/// sub-microsecond precision, so the text always parses back to the same value.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::SmallInt(v) => write!(f, "{}", v),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::BigInt(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Decimal(d) => write!(f, "{}", d),
            FieldValue::Uuid(u) => write!(f, "{}", u.hyphenated()),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            FieldValue::Timestamp(ts) if has_sub_micros(ts.nanosecond()) => {
                write!(f, "{}", ts.format(TIMESTAMP_NANOS_FORMAT))
            }
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            FieldValue::TimestampTz(ts) if has_sub_micros(ts.nanosecond()) => {
                write!(f, "{}", ts.format(TIMESTAMP_TZ_NANOS_FORMAT))
            }
            FieldValue::TimestampTz(ts) => write!(f, "{}", ts.format(TIMESTAMP_TZ_FORMAT)),
            FieldValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<String> for FieldValue {
    fn from(val: String) -> Self {
        FieldValue::Text(val)
    }
}

impl From<&str> for FieldValue {
    fn from(val: &str) -> Self {
        FieldValue::Text(val.to_string())
    }
}

impl From<i16> for FieldValue {
    fn from(val: i16) -> Self {
        FieldValue::SmallInt(val)
    }
}

impl From<i32> for FieldValue {
    fn from(val: i32) -> Self {
        FieldValue::Integer(val)
    }
}

impl From<i64> for FieldValue {
    fn from(val: i64) -> Self {
        FieldValue::BigInt(val)
    }
}

impl From<f64> for FieldValue {
    fn from(val: f64) -> Self {
        FieldValue::Float(val)
    }
}

impl From<bool> for FieldValue {
    fn from(val: bool) -> Self {
        FieldValue::Boolean(val)
    }
}

impl From<Decimal> for FieldValue {
    fn from(val: Decimal) -> Self {
        FieldValue::Decimal(val)
    }
}

impl From<Uuid> for FieldValue {
    fn from(val: Uuid) -> Self {
        FieldValue::Uuid(val)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(val: NaiveDate) -> Self {
        FieldValue::Date(val)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(val: NaiveDateTime) -> Self {
        FieldValue::Timestamp(val)
    }
}

impl From<DateTime<FixedOffset>> for FieldValue {
    fn from(val: DateTime<FixedOffset>) -> Self {
        FieldValue::TimestampTz(val)
    }
}

impl From<DateTime<chrono::Utc>> for FieldValue {
    fn from(val: DateTime<chrono::Utc>) -> Self {
        FieldValue::TimestampTz(val.fixed_offset())
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(val: serde_json::Value) -> Self {
        FieldValue::Json(val)
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(val: Option<T>) -> Self {
        match val {
            Some(v) => v.into(),
            None => FieldValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_cache_round_trip_keeps_types() {
        let values = vec![
            FieldValue::Uuid(Uuid::new_v4()),
            FieldValue::Decimal(Decimal::from_str("12.500").unwrap()),
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            FieldValue::TimestampTz(
                DateTime::parse_from_rfc3339("2024-03-01T10:15:30.123456+02:00").unwrap(),
            ),
            FieldValue::SmallInt(7),
            FieldValue::Null,
        ];

        let json = serde_json::to_string(&values).unwrap();
        let back: Vec<FieldValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(values, back);

        // Decimal scale survives, not just numeric equality
        if let FieldValue::Decimal(d) = &back[1] {
            assert_eq!(d.to_string(), "12.500");
        }
        // Offset survives too
        if let FieldValue::TimestampTz(ts) = &back[3] {
            assert_eq!(ts.offset().local_minus_utc(), 2 * 3600);
        }
    }

    #[test]
    fn test_non_finite_floats_survive_cache_round_trip() {
        let values = vec![
            FieldValue::Float(f64::NAN),
            FieldValue::Float(f64::INFINITY),
            FieldValue::Float(f64::NEG_INFINITY),
            FieldValue::Float(1.5),
        ];

        let json = serde_json::to_string(&values).unwrap();
        assert!(json.contains(r#"{"type":"float","value":"NaN"}"#));

        let back: Vec<FieldValue> = serde_json::from_str(&json).unwrap();
        assert!(matches!(back[0], FieldValue::Float(v) if v.is_nan()));
        assert_eq!(back[1..], values[1..]);

        let bad = serde_json::from_str::<FieldValue>(r#"{"type":"float","value":"big"}"#);
        assert!(bad.is_err());
        let whole: FieldValue = serde_json::from_str(r#"{"type":"float","value":3}"#).unwrap();
        assert_eq!(whole, FieldValue::Float(3.0));
    }

    #[test]
    fn test_display_keeps_sub_microsecond_precision() {
        let precise = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_nano_opt(3, 4, 5, 123_456_789)
            .unwrap();
        let text = FieldValue::Timestamp(precise).to_string();
        assert_eq!(text, "2024-01-02 03:04:05.123456789");
        assert_eq!(
            FieldValue::parse_as(crate::FieldType::Timestamp, &text).unwrap(),
            FieldValue::Timestamp(precise)
        );

        let zoned = DateTime::parse_from_rfc3339("2024-01-02T03:04:05.000000300+01:00").unwrap();
        let text = FieldValue::TimestampTz(zoned).to_string();
        assert_eq!(text, "2024-01-02 03:04:05.000000300+01:00");
        assert_eq!(
            FieldValue::parse_as(crate::FieldType::TimestampTz, &text).unwrap(),
            FieldValue::TimestampTz(zoned)
        );
    }

    #[test]
    fn test_compare_across_integer_widths() {
        assert_eq!(
            FieldValue::SmallInt(3).compare(&FieldValue::BigInt(10)),
            Some(Ordering::Less)
        );
        assert_eq!(
            FieldValue::Integer(10).compare(&FieldValue::BigInt(10)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            FieldValue::Float(2.5).compare(&FieldValue::Integer(2)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            FieldValue::Integer(2).compare(&FieldValue::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            FieldValue::Decimal(Decimal::from_str("1.5").unwrap()).compare(&FieldValue::Integer(1)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_compare_incomparable() {
        assert_eq!(FieldValue::Null.compare(&FieldValue::Null), None);
        assert_eq!(
            FieldValue::Text("a".into()).compare(&FieldValue::Integer(1)),
            None
        );
    }

    #[test]
    fn test_display_fixed_formats() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(
            FieldValue::Timestamp(ts).to_string(),
            "2024-01-02 03:04:05.000000"
        );
        let tz = DateTime::parse_from_rfc3339("2024-01-02T03:04:05.25+01:00").unwrap();
        assert_eq!(
            FieldValue::TimestampTz(tz).to_string(),
            "2024-01-02 03:04:05.250000+01:00"
        );
    }

    #[test]
    fn test_option_into_value() {
        let none: Option<i32> = None;
        assert_eq!(FieldValue::from(none), FieldValue::Null);
        assert_eq!(FieldValue::from(Some(4)), FieldValue::Integer(4));
    }
}
