//! Native value types for cells moving between typed tables and Redshift.
//!
//! [`Value`] is a borrowed view of one cell. Decoders produce owned values,
//! encoders read borrowed ones straight out of a [`ColumnData`](super::ColumnData).

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

/// Native cell value with efficient memory usage.
///
/// Uses `Cow` for string, byte and JSON data so that encoders can borrow from
/// the table without copying.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// NULL.
    Null,

    /// Boolean value.
    Bool(bool),

    /// 16-bit signed integer.
    I16(i16),

    /// 32-bit signed integer.
    I32(i32),

    /// 64-bit signed integer.
    I64(i64),

    /// 64-bit floating point. `NaN` is treated as NULL.
    F64(f64),

    /// Decimal value with arbitrary precision.
    Decimal(Decimal),

    /// Text data.
    Text(Cow<'a, str>),

    /// Raw byte string. Must be valid UTF-8 to be written as text.
    Bytes(Cow<'a, [u8]>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// Time of day normalized to UTC.
    TimeTz(NaiveTime),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),

    /// Timestamp normalized to UTC.
    DateTimeTz(DateTime<Utc>),

    /// Semi-structured value.
    Json(Cow<'a, serde_json::Value>),
}

impl<'a> Value<'a> {
    /// Convert to a fully owned value with `'static` lifetime.
    #[must_use]
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(v) => Value::Bool(v),
            Value::I16(v) => Value::I16(v),
            Value::I32(v) => Value::I32(v),
            Value::I64(v) => Value::I64(v),
            Value::F64(v) => Value::F64(v),
            Value::Decimal(v) => Value::Decimal(v),
            Value::Text(v) => Value::Text(Cow::Owned(v.into_owned())),
            Value::Bytes(v) => Value::Bytes(Cow::Owned(v.into_owned())),
            Value::Date(v) => Value::Date(v),
            Value::Time(v) => Value::Time(v),
            Value::TimeTz(v) => Value::TimeTz(v),
            Value::DateTime(v) => Value::DateTime(v),
            Value::DateTimeTz(v) => Value::DateTimeTz(v),
            Value::Json(v) => Value::Json(Cow::Owned(v.into_owned())),
        }
    }

    /// Check if this value is NULL. Floating point `NaN` counts as NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::F64(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Short name of the value's native kind, used in error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::TimeTz(_) => "timetz",
            Value::DateTime(_) => "timestamp",
            Value::DateTimeTz(_) => "timestamptz",
            Value::Json(_) => "json",
        }
    }

    /// Widen any integer variant to `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Render the value as JSON for display and export.
    ///
    /// Decimals and temporal values become strings so no precision is lost.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::Null => J::Null,
            Value::Bool(v) => J::Bool(*v),
            Value::I16(v) => J::from(*v),
            Value::I32(v) => J::from(*v),
            Value::I64(v) => J::from(*v),
            Value::F64(v) => serde_json::Number::from_f64(*v).map_or(J::Null, J::Number),
            Value::Decimal(v) => J::String(v.to_string()),
            Value::Text(v) => J::String(v.to_string()),
            Value::Bytes(v) => J::String(String::from_utf8_lossy(v).into_owned()),
            Value::Date(v) => J::String(v.format("%Y-%m-%d").to_string()),
            Value::Time(v) => J::String(v.format("%H:%M:%S%.f").to_string()),
            Value::TimeTz(v) => J::String(format!("{}+00:00", v.format("%H:%M:%S%.f"))),
            Value::DateTime(v) => J::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::DateTimeTz(v) => J::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
            Value::Json(v) => v.as_ref().clone(),
        }
    }

    /// Build a value from a JSON scalar or container.
    ///
    /// Integers that fit `i64` become [`Value::I64`], other numbers
    /// [`Value::F64`], strings [`Value::Text`], and arrays/objects
    /// [`Value::Json`].
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Value<'static> {
        use serde_json::Value as J;
        match value {
            J::Null => Value::Null,
            J::Bool(b) => Value::Bool(*b),
            J::Number(n) => match n.as_i64() {
                Some(i) => Value::I64(i),
                None => Value::F64(n.as_f64().unwrap_or(f64::NAN)),
            },
            J::String(s) => Value::Text(Cow::Owned(s.clone())),
            J::Array(_) | J::Object(_) => Value::Json(Cow::Owned(value.clone())),
        }
    }
}

impl From<bool> for Value<'static> {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value<'static> {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value<'static> {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value<'static> {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value<'static> {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<Decimal> for Value<'static> {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value<'static> {
    fn from(v: String) -> Self {
        Value::Text(Cow::Owned(v))
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Text(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for Value<'static> {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Cow::Owned(v))
    }
}

impl From<NaiveDate> for Value<'static> {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value<'static> {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value<'static> {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Value<'static> {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTimeTz(v)
    }
}

impl From<serde_json::Value> for Value<'static> {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(Cow::Owned(v))
    }
}

impl<T> From<Option<T>> for Value<'static>
where
    T: Into<Value<'static>>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_into_owned() {
        let borrowed: Value<'_> = Value::Text(Cow::Borrowed("hello"));
        let owned: Value<'static> = borrowed.into_owned();
        assert_eq!(owned, Value::Text(Cow::Owned("hello".to_string())));
    }

    #[test]
    fn test_value_is_null() {
        assert!(Value::Null.is_null());
        assert!(Value::F64(f64::NAN).is_null());
        assert!(!Value::F64(0.0).is_null());
        assert!(!Value::I32(42).is_null());
    }

    #[test]
    fn test_from_option() {
        let v: Value<'static> = Some(7i64).into();
        assert_eq!(v, Value::I64(7));
        let v: Value<'static> = Option::<i64>::None.into();
        assert_eq!(v, Value::Null);
    }

    #[test]
    fn test_json_import_classifies_numbers() {
        assert_eq!(Value::from_json(&serde_json::json!(3)), Value::I64(3));
        assert_eq!(Value::from_json(&serde_json::json!(3.5)), Value::F64(3.5));
        assert!(matches!(
            Value::from_json(&serde_json::json!({"a": 1})),
            Value::Json(_)
        ));
    }

    #[test]
    fn test_to_json_keeps_decimal_text() {
        let d: Decimal = "123.450".parse().unwrap();
        assert_eq!(Value::Decimal(d).to_json(), serde_json::json!("123.450"));
    }
}
