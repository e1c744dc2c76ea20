//! Core value types for SweetDB

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{Result, SweetError};

/// A database value that can represent any scalar SQL type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit unsigned integer that does not fit in `i64`
    UInt64(u64),
    /// 64-bit floating point
    Float64(f64),
    /// Decimal/Numeric (stored as string for precision)
    Decimal(String),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Date (year, month, day)
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// DateTime without timezone
    DateTime(NaiveDateTime),
    /// JSON value
    Json(serde_json::Value),
}

impl Value {
    /// Check if the value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            Value::UInt64(v) => i64::try_from(*v).ok(),
            Value::Bool(v) => Some(i64::from(*v)),
            Value::String(s) | Value::Decimal(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        }
    }

    /// Try to get as u64
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt64(v) => Some(*v),
            Value::Int64(v) => u64::try_from(*v).ok(),
            Value::String(s) | Value::Decimal(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        }
    }

    /// Try to get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            Value::Int64(v) => Some(*v as f64),
            Value::UInt64(v) => Some(*v as f64),
            Value::String(s) | Value::Decimal(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Try to get as bool.
    ///
    /// MySQL and SQLite both report booleans as integers, so `0`/`1` are
    /// accepted as well.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int64(0) => Some(false),
            Value::Int64(1) => Some(true),
            _ => None,
        }
    }

    /// Try to get as raw bytes
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Short name of the variant, used in conversion error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "bool",
            Value::Int64(_) => "int64",
            Value::UInt64(_) => "uint64",
            Value::Float64(_) => "float64",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Json(_) => "json",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Date(v) => write!(f, "{}", v),
            Value::Time(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

impl_from_for_value! {
    bool => |v| Value::Bool(v),
    i8 => |v| Value::Int64(v as i64),
    i16 => |v| Value::Int64(v as i64),
    i32 => |v| Value::Int64(v as i64),
    i64 => |v| Value::Int64(v),
    u16 => |v| Value::Int64(v as i64),
    u32 => |v| Value::Int64(v as i64),
    u64 => |v| i64::try_from(v).map(Value::Int64).unwrap_or(Value::UInt64(v)),
    f32 => |v| Value::Float64(v as f64),
    f64 => |v| Value::Float64(v),
    String => |v| Value::String(v),
    &str => |v| Value::String(v.to_string()),
    Vec<u8> => |v| Value::Bytes(v),
    &[u8] => |v| Value::Bytes(v.to_vec()),
    NaiveDate => |v| Value::Date(v),
    NaiveTime => |v| Value::Time(v),
    NaiveDateTime => |v| Value::DateTime(v),
    serde_json::Value => |v| Value::Json(v),
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Conversion from a database [`Value`] into a Rust type.
///
/// Used by the typed accessors on rows and connections. A value that
/// cannot be represented as the requested type is a logic error.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

fn mismatch<T>(value: &Value, wanted: &str) -> Result<T> {
    Err(SweetError::Logic(format!(
        "cannot convert {} value '{}' to {}",
        value.type_name(),
        value,
        wanted
    )))
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_i64() {
            Some(v) => Ok(v),
            None => mismatch(value, "i64"),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_i64().and_then(|v| i32::try_from(v).ok()) {
            Some(v) => Ok(v),
            None => mismatch(value, "i32"),
        }
    }
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_u64() {
            Some(v) => Ok(v),
            None => mismatch(value, "u64"),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_f64() {
            Some(v) => Ok(v),
            None => mismatch(value, "f64"),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_bool() {
            Some(v) => Ok(v),
            None => mismatch(value, "bool"),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) | Value::Decimal(s) => Ok(s.clone()),
            Value::Json(j) => Ok(j.to_string()),
            _ => mismatch(value, "String"),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        match value.as_bytes() {
            Some(b) => Ok(b.to_vec()),
            None => mismatch(value, "bytes"),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::DateTime(dt) => Ok(dt.date()),
            Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| mismatch(value, "NaiveDate")),
            _ => mismatch(value, "NaiveDate"),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Time(t) => Ok(*t),
            Value::String(s) => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
                .or_else(|_| mismatch(value, "NaiveTime")),
            _ => mismatch(value, "NaiveTime"),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            Value::String(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .or_else(|_| mismatch(value, "NaiveDateTime")),
            _ => mismatch(value, "NaiveDateTime"),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Json(j) => Ok(j.clone()),
            Value::String(s) => {
                serde_json::from_str(s).or_else(|_| mismatch(value, "JSON"))
            }
            _ => mismatch(value, "JSON"),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ColumnMeta {
    /// Column name
    #[serde(default)]
    pub name: String,
    /// Data type (database-specific string)
    #[serde(default)]
    pub data_type: String,
    /// Column ordinal position (0-based)
    #[serde(default)]
    pub ordinal: usize,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, ordinal: usize) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            ordinal,
        }
    }
}

/// Outcome of a statement that does not produce rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatementResult {
    /// Rows affected, as reported by the driver
    pub affected_rows: u64,
    /// Id generated for an auto-increment column, if the driver reported one
    pub last_insert_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_accessors_cross_widths() {
        assert_eq!(Value::Int64(20).as_i64(), Some(20));
        assert_eq!(Value::UInt64(u64::MAX).as_i64(), None);
        assert_eq!(Value::UInt64(u64::MAX).as_u64(), Some(u64::MAX));
        assert_eq!(Value::Decimal(" 42 ".into()).as_i64(), Some(42));
        assert_eq!(Value::Int64(-1).as_u64(), None);
    }

    #[test]
    fn bool_accepts_integer_flags() {
        assert_eq!(Value::Int64(1).as_bool(), Some(true));
        assert_eq!(Value::Int64(0).as_bool(), Some(false));
        assert_eq!(Value::Int64(2).as_bool(), None);
    }

    #[test]
    fn from_u64_prefers_signed_when_it_fits() {
        assert_eq!(Value::from(7u64), Value::Int64(7));
        assert_eq!(Value::from(u64::MAX), Value::UInt64(u64::MAX));
    }

    #[test]
    fn option_maps_none_to_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }

    #[test]
    fn from_value_reports_logic_error_on_mismatch() {
        let err = i64::from_value(&Value::Bytes(vec![0xff])).unwrap_err();
        assert!(err.is_logic(), "unexpected error: {err}");

        let err = i32::from_value(&Value::Int64(i64::MAX)).unwrap_err();
        assert!(err.is_logic());
    }

    #[test]
    fn from_value_parses_textual_dates() {
        let d = NaiveDate::from_value(&Value::String("2011-04-30".into())).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2011, 4, 30).unwrap());

        let dt =
            NaiveDateTime::from_value(&Value::String("2011-04-30 22:44:39".into())).unwrap();
        assert_eq!(dt.date(), d);
    }

    #[test]
    fn optional_conversion_passes_null_through() {
        assert_eq!(Option::<i64>::from_value(&Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_value(&Value::Int64(3)).unwrap(), Some(3));
    }
}
