//! Row decoding into JSON.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres_types::{FromSql, Kind, Type};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Value};
use tokio_postgres::Row;

use crate::error::{BackendError, StorageError, StorageResult};

/// Wire bytes of a non-null column, whatever its type.
struct RawValue<'a>(&'a [u8]);

impl<'a> FromSql<'a> for RawValue<'a> {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(RawValue(raw))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn decode_error(column: &str, message: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(BackendError::SerializationError {
        message: format!("failed to decode column {}: {}", column, message),
    })
}

fn numeric_to_json(value: Decimal) -> Value {
    if value.fract().is_zero() {
        if let Some(i) = value.to_i64() {
            return Value::from(i);
        }
    }
    value
        .to_f64()
        .map(Value::from)
        .unwrap_or_else(|| Value::String(value.to_string()))
}

/// Resolves domains to the type whose wire format they share.
fn base_type(mut ty: &Type) -> &Type {
    while let Kind::Domain(base) = ty.kind() {
        ty = base;
    }
    ty
}

fn parse<'a, T: FromSql<'a>>(ty: &Type, raw: &'a [u8], column: &str) -> StorageResult<T> {
    T::from_sql(ty, raw).map_err(|e| decode_error(column, e))
}

/// Decodes one column of a row using the column's native type.
///
/// SQL NULL becomes `Value::Null`. Types without a native mapping are
/// returned as their wire text when it is valid UTF-8, otherwise base64.
pub fn decode_column(row: &Row, idx: usize) -> StorageResult<Value> {
    let column = &row.columns()[idx];
    let name = column.name();

    let raw = row
        .try_get::<_, Option<RawValue<'_>>>(idx)
        .map_err(|e| decode_error(name, e))?;
    let Some(RawValue(raw)) = raw else {
        return Ok(Value::Null);
    };

    let ty = base_type(column.type_());
    let value = match *ty {
        Type::BOOL => Value::Bool(parse(ty, raw, name)?),
        Type::INT2 => Value::from(parse::<i16>(ty, raw, name)?),
        Type::INT4 => Value::from(parse::<i32>(ty, raw, name)?),
        Type::INT8 => Value::from(parse::<i64>(ty, raw, name)?),
        Type::OID => Value::from(parse::<u32>(ty, raw, name)?),
        Type::FLOAT4 => Value::from(f64::from(parse::<f32>(ty, raw, name)?)),
        Type::FLOAT8 => Value::from(parse::<f64>(ty, raw, name)?),
        Type::NUMERIC => numeric_to_json(parse(ty, raw, name)?),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            Value::String(parse(ty, raw, name)?)
        }
        Type::JSON | Type::JSONB => parse::<Value>(ty, raw, name)?,
        Type::DATE => {
            let date: NaiveDate = parse(ty, raw, name)?;
            Value::String(date.format("%Y-%m-%d").to_string())
        }
        Type::TIME => {
            let time: NaiveTime = parse(ty, raw, name)?;
            Value::String(time.format("%H:%M:%S%.f").to_string())
        }
        Type::TIMESTAMP => {
            let ts: NaiveDateTime = parse(ty, raw, name)?;
            Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }
        Type::TIMESTAMPTZ => {
            let ts: DateTime<Utc> = parse(ty, raw, name)?;
            Value::String(ts.to_rfc3339())
        }
        Type::UUID => Value::String(parse::<uuid::Uuid>(ty, raw, name)?.to_string()),
        Type::BYTEA => Value::String(STANDARD.encode(parse::<&[u8]>(ty, raw, name)?)),
        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => {
            Value::from(parse::<Vec<Option<String>>>(ty, raw, name)?)
        }
        Type::INT4_ARRAY => Value::from(parse::<Vec<Option<i32>>>(ty, raw, name)?),
        Type::INT8_ARRAY => Value::from(parse::<Vec<Option<i64>>>(ty, raw, name)?),
        Type::BOOL_ARRAY => Value::from(parse::<Vec<Option<bool>>>(ty, raw, name)?),
        Type::FLOAT8_ARRAY => Value::from(parse::<Vec<Option<f64>>>(ty, raw, name)?),
        _ => match std::str::from_utf8(raw) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => Value::String(STANDARD.encode(raw)),
        },
    };

    Ok(value)
}

/// Decodes a full row into a JSON object keyed by column name.
pub fn decode_row(row: &Row) -> StorageResult<Map<String, Value>> {
    let mut object = Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        object.insert(column.name().to_string(), decode_column(row, idx)?);
    }
    Ok(object)
}
