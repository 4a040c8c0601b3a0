//! Bound parameter values.
//!
//! Caller data arrives as generically decoded JSON. Before it reaches the
//! driver every value is normalized into a [`SqlValue`], one of five concrete
//! scalars. [`SqlValue`] then encodes itself against whatever parameter type
//! the server inferred for its placeholder, so `{"age": 30}` binds into an
//! `int4`, `numeric` or `text` column alike.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use postgres_types::{IsNull, Kind, ToSql, Type, to_sql_checked};
use rust_decimal::Decimal;
use serde_json::Value;

type BoxError = Box<dyn Error + Sync + Send>;

/// A normalized scalar bound as a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// Text.
    Text(String),
}

impl SqlValue {
    /// Normalizes a decoded JSON value.
    ///
    /// Integral numbers become [`SqlValue::Integer`], other numbers
    /// [`SqlValue::Float`]. Arrays and objects are bound as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => SqlValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SqlValue::Null => "null",
            SqlValue::Bool(_) => "boolean",
            SqlValue::Integer(_) => "integer",
            SqlValue::Float(_) => "float",
            SqlValue::Text(_) => "text",
        }
    }

    /// Converts to JSON, used when the target column is `json`/`jsonb`.
    fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Integer(i) => Value::from(*i),
            SqlValue::Float(f) => Value::from(*f),
            SqlValue::Text(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
        }
    }
}

/// A value could not be encoded for the column type the server expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueEncodeError {
    /// Variant of the value being bound.
    pub value_kind: &'static str,
    /// Server type name of the placeholder.
    pub target_type: String,
    /// What went wrong.
    pub reason: String,
}

impl fmt::Display for ValueEncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot bind {} value to {} column: {}",
            self.value_kind, self.target_type, self.reason
        )
    }
}

impl Error for ValueEncodeError {}

fn encode_error(value: &SqlValue, ty: &Type, reason: impl fmt::Display) -> BoxError {
    Box::new(ValueEncodeError {
        value_kind: value.kind(),
        target_type: ty.name().to_string(),
        reason: reason.to_string(),
    })
}

/// Types whose binary wire format is plain UTF-8 text.
fn is_text_like(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    ) || ty.name() == "citext"
        || matches!(ty.kind(), Kind::Enum(_))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_naive_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_utc_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| parse_naive_datetime(s).map(|naive| naive.and_utc()))
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

impl SqlValue {
    fn encode_integer(&self, i: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match *ty {
            Type::INT2 => i16::try_from(i)
                .map_err(|e| encode_error(self, ty, e))?
                .to_sql(ty, out),
            Type::INT4 => i32::try_from(i)
                .map_err(|e| encode_error(self, ty, e))?
                .to_sql(ty, out),
            Type::INT8 => i.to_sql(ty, out),
            Type::FLOAT4 => (i as f32).to_sql(ty, out),
            Type::FLOAT8 => (i as f64).to_sql(ty, out),
            Type::NUMERIC => Decimal::from(i).to_sql(ty, out),
            Type::JSON | Type::JSONB => Value::from(i).to_sql(ty, out),
            _ if is_text_like(ty) => i.to_string().as_str().to_sql(ty, out),
            _ => Err(encode_error(self, ty, "unsupported column type")),
        }
    }

    fn encode_float(&self, f: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match *ty {
            Type::FLOAT4 => (f as f32).to_sql(ty, out),
            Type::FLOAT8 => f.to_sql(ty, out),
            Type::NUMERIC => Decimal::try_from(f)
                .map_err(|e| encode_error(self, ty, e))?
                .to_sql(ty, out),
            Type::INT2 | Type::INT4 | Type::INT8 => {
                if f.fract() != 0.0 || !f.is_finite() || f.abs() > i64::MAX as f64 {
                    return Err(encode_error(self, ty, "value is not a whole number"));
                }
                self.encode_integer(f as i64, ty, out)
            }
            Type::JSON | Type::JSONB => Value::from(f).to_sql(ty, out),
            _ if is_text_like(ty) => f.to_string().as_str().to_sql(ty, out),
            _ => Err(encode_error(self, ty, "unsupported column type")),
        }
    }

    fn encode_text(&self, s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        if is_text_like(ty) {
            return s.to_sql(ty, out);
        }
        let unparseable = || encode_error(self, ty, format!("cannot parse {:?}", s));
        match *ty {
            Type::INT2 | Type::INT4 | Type::INT8 => {
                let i: i64 = s.trim().parse().map_err(|_| unparseable())?;
                self.encode_integer(i, ty, out)
            }
            Type::FLOAT4 | Type::FLOAT8 => {
                let f: f64 = s.trim().parse().map_err(|_| unparseable())?;
                self.encode_float(f, ty, out)
            }
            Type::NUMERIC => parse_decimal(s).ok_or_else(unparseable)?.to_sql(ty, out),
            Type::BOOL => parse_bool(s).ok_or_else(unparseable)?.to_sql(ty, out),
            Type::DATE => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| unparseable())?
                .to_sql(ty, out),
            Type::TIME => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                .map_err(|_| unparseable())?
                .to_sql(ty, out),
            Type::TIMESTAMP => parse_naive_datetime(s).ok_or_else(unparseable)?.to_sql(ty, out),
            Type::TIMESTAMPTZ => parse_utc_datetime(s).ok_or_else(unparseable)?.to_sql(ty, out),
            Type::UUID => uuid::Uuid::parse_str(s.trim())
                .map_err(|_| unparseable())?
                .to_sql(ty, out),
            Type::JSON | Type::JSONB => self.to_json().to_sql(ty, out),
            Type::BYTEA => s.as_bytes().to_sql(ty, out),
            _ => Err(encode_error(self, ty, "unsupported column type")),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        // Domains share the wire format of their base type.
        if let Kind::Domain(base) = ty.kind() {
            return self.to_sql(base, out);
        }

        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                Type::JSON | Type::JSONB => Value::Bool(*b).to_sql(ty, out),
                _ if is_text_like(ty) => b.to_string().as_str().to_sql(ty, out),
                _ => Err(encode_error(self, ty, "unsupported column type")),
            },
            SqlValue::Integer(i) => self.encode_integer(*i, ty, out),
            SqlValue::Float(f) => self.encode_float(*f, ty, out),
            SqlValue::Text(s) => self.encode_text(s, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}
