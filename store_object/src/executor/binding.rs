//! Moving typed values across the sqlx boundary
//!
//! Outbound: every `FieldValue` binds with its own Postgres type, so a cursor
//! on a timestamp column compares as a timestamp and not as text.
//! Inbound: row columns decode by the declared schema type, falling back to
//! the column's reported Postgres type for columns a raw query adds.

use crate::errors::StoreError;
use crate::schema::SchemaDescriptor;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row as _, TypeInfo};
use type_mapping::{FieldType, FieldValue, Row};
use uuid::Uuid;

pub(crate) fn bind_value(
    query: Query<'_, Postgres, PgArguments>,
    value: FieldValue,
) -> Query<'_, Postgres, PgArguments> {
    match value {
        FieldValue::Null => query.bind(Option::<String>::None),
        FieldValue::Boolean(b) => query.bind(b),
        FieldValue::SmallInt(v) => query.bind(v),
        FieldValue::Integer(v) => query.bind(v),
        FieldValue::BigInt(v) => query.bind(v),
        FieldValue::Float(v) => query.bind(v),
        FieldValue::Decimal(d) => query.bind(d),
        FieldValue::Uuid(u) => query.bind(u),
        FieldValue::Text(s) => query.bind(s),
        FieldValue::Date(d) => query.bind(d),
        FieldValue::Timestamp(ts) => query.bind(ts),
        FieldValue::TimestampTz(ts) => query.bind(ts.with_timezone(&Utc)),
        FieldValue::Json(v) => query.bind(sqlx::types::Json(v)),
    }
}

/// Postgres type name as reported by the driver, to a field type
fn field_type_for(pg_type: &str) -> Option<FieldType> {
    Some(match pg_type {
        "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => FieldType::Char,
        "TEXT" => FieldType::Text,
        "INT2" => FieldType::SmallInt,
        "INT4" => FieldType::Int,
        "INT8" => FieldType::BigInt,
        "FLOAT8" => FieldType::Float,
        "NUMERIC" => FieldType::Decimal,
        "UUID" => FieldType::Uuid,
        "BOOL" => FieldType::Boolean,
        "DATE" => FieldType::Date,
        "TIMESTAMP" => FieldType::Timestamp,
        "TIMESTAMPTZ" => FieldType::TimestampTz,
        "JSON" | "JSONB" => FieldType::Json,
        _ => return None,
    })
}

pub(crate) fn decode_row(row: &PgRow, schema: &SchemaDescriptor) -> Result<Row, StoreError> {
    let mut decoded = Row::new();

    for (index, column) in row.columns().iter().enumerate() {
        let name = column.name();
        let field_type = match schema.field(name) {
            Some(field) => field.field_type(),
            None => field_type_for(column.type_info().name()).ok_or_else(|| StoreError::Decode {
                column: name.to_string(),
                reason: format!("unsupported column type {}", column.type_info().name()),
            })?,
        };

        let value = decode_column(row, index, field_type).map_err(|e| StoreError::Decode {
            column: name.to_string(),
            reason: e.to_string(),
        })?;
        decoded.insert(name.to_string(), value);
    }

    Ok(decoded)
}

fn decode_column(row: &PgRow, index: usize, field_type: FieldType) -> Result<FieldValue, sqlx::Error> {
    fn get<'r, T>(row: &'r PgRow, index: usize) -> Result<Option<T>, sqlx::Error>
    where
        T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    {
        row.try_get::<Option<T>, _>(index)
    }

    let value = match field_type {
        FieldType::Char | FieldType::Text => get::<String>(row, index)?.map(FieldValue::Text),
        FieldType::SmallInt => get::<i16>(row, index)?.map(FieldValue::SmallInt),
        FieldType::Int => get::<i32>(row, index)?.map(FieldValue::Integer),
        FieldType::BigInt => get::<i64>(row, index)?.map(FieldValue::BigInt),
        FieldType::Float => get::<f64>(row, index)?.map(FieldValue::Float),
        FieldType::Decimal => get::<Decimal>(row, index)?.map(FieldValue::Decimal),
        FieldType::Uuid => get::<Uuid>(row, index)?.map(FieldValue::Uuid),
        FieldType::Boolean => get::<bool>(row, index)?.map(FieldValue::Boolean),
        FieldType::Date => get::<NaiveDate>(row, index)?.map(FieldValue::Date),
        FieldType::Timestamp => get::<NaiveDateTime>(row, index)?.map(FieldValue::Timestamp),
        FieldType::TimestampTz => get::<DateTime<Utc>>(row, index)?
            .map(|ts| FieldValue::TimestampTz(ts.fixed_offset())),
        FieldType::Json => get::<serde_json::Value>(row, index)?.map(FieldValue::Json),
    };

    Ok(value.unwrap_or(FieldValue::Null))
}
