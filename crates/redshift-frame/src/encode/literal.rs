//! Conversion of native values into Redshift SQL literals.
//!
//! Every function here validates the value against its target type and
//! either returns the literal text or a human-readable reason.

use std::borrow::Cow;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::catalog::RedshiftType;
use crate::core::Value;
use crate::decode::temporal;

/// Smallest non-zero magnitude accepted for `DOUBLE PRECISION`.
pub const DOUBLE_MIN_ABS: f64 = 2.22507385850721e-308;
/// Largest magnitude accepted for `DOUBLE PRECISION`.
pub const DOUBLE_MAX_ABS: f64 = 1.79769313486231e308;
/// Smallest non-zero magnitude accepted for `REAL`.
pub const REAL_MIN_ABS: f64 = 1.1755e-38;
/// Largest magnitude accepted for `REAL`.
pub const REAL_MAX_ABS: f64 = 3.40282e38;

/// Largest scale `rust_decimal` can represent.
const DECIMAL_MAX_SCALE: u32 = 28;

type LiteralResult = std::result::Result<String, String>;

/// Encode one value as a literal for `redshift_type`.
///
/// NULL (and floating point NaN) always encodes as `NULL`.
pub fn encode_value(redshift_type: &RedshiftType, value: &Value<'_>) -> LiteralResult {
    if value.is_null() {
        return Ok("NULL".to_string());
    }

    match redshift_type {
        RedshiftType::SmallInt | RedshiftType::Integer | RedshiftType::BigInt => {
            encode_integer(redshift_type, value)
        }
        RedshiftType::Real => encode_float(redshift_type, value, REAL_MIN_ABS, REAL_MAX_ABS),
        RedshiftType::DoublePrecision => {
            encode_float(redshift_type, value, DOUBLE_MIN_ABS, DOUBLE_MAX_ABS)
        }
        RedshiftType::Numeric { precision, scale } => {
            encode_numeric(redshift_type, value, u32::from(*precision), u32::from(*scale))
        }
        RedshiftType::Boolean => encode_boolean(value),
        RedshiftType::Char(_)
        | RedshiftType::BPChar(_)
        | RedshiftType::VarChar(_)
        | RedshiftType::Text
        | RedshiftType::Geometry => {
            let text = value_as_text(value)?;
            check_text(redshift_type, &text)?;
            Ok(quote_text(&text))
        }
        RedshiftType::Date => encode_date(value),
        RedshiftType::TimeStamp => encode_timestamp(value),
        RedshiftType::TimeStampTz => encode_timestamptz(value),
        RedshiftType::Time => encode_time(value),
        RedshiftType::TimeTz => encode_timetz(value),
        RedshiftType::Super => encode_super(value),
    }
}

fn cannot_convert(value: &Value<'_>, redshift_type: impl std::fmt::Display) -> String {
    format!("cannot convert {} value to {}", value.kind_name(), redshift_type)
}

fn out_of_range(shown: impl std::fmt::Display, redshift_type: &RedshiftType) -> String {
    format!("'{}' is out of range for type '{}'", shown, redshift_type)
}

fn encode_integer(redshift_type: &RedshiftType, value: &Value<'_>) -> LiteralResult {
    let v: i64 = match value {
        Value::I16(_) | Value::I32(_) | Value::I64(_) => value.as_i64().unwrap_or_default(),
        Value::Bool(b) => i64::from(*b),
        Value::F64(f) => {
            if !f.is_finite() || f.fract() != 0.0 {
                return Err(format!("'{:?}' is not an integral value", f));
            }
            if *f < i64::MIN as f64 || *f >= i64::MAX as f64 {
                return Err(out_of_range(format!("{:?}", f), redshift_type));
            }
            *f as i64
        }
        Value::Decimal(d) => {
            if !d.fract().is_zero() {
                return Err(format!("'{}' is not an integral value", d));
            }
            d.to_i64().ok_or_else(|| out_of_range(d, redshift_type))?
        }
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("'{}' is not an integral value", s))?,
        other => return Err(cannot_convert(other, redshift_type)),
    };

    let (min, max) = redshift_type.integer_range().unwrap_or((i64::MIN, i64::MAX));
    if v < min || v > max {
        return Err(out_of_range(v, redshift_type));
    }
    Ok(v.to_string())
}

fn encode_float(redshift_type: &RedshiftType, value: &Value<'_>, min_abs: f64, max_abs: f64) -> LiteralResult {
    let v: f64 = match value {
        Value::I16(_) | Value::I32(_) | Value::I64(_) => value.as_i64().unwrap_or_default() as f64,
        Value::F64(f) => *f,
        Value::Decimal(d) => d.to_f64().ok_or_else(|| cannot_convert(value, redshift_type))?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", s))?,
        other => return Err(cannot_convert(other, redshift_type)),
    };

    if v.is_nan() {
        return Ok("NULL".to_string());
    }
    if v != 0.0 {
        let abs = v.abs();
        if abs < min_abs || abs > max_abs {
            return Err(out_of_range(format!("{:?}", v), redshift_type));
        }
    }
    Ok(format!("{:?}", v))
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok()
}

fn encode_numeric(redshift_type: &RedshiftType, value: &Value<'_>, precision: u32, scale: u32) -> LiteralResult {
    let original: Decimal = match value {
        Value::I16(_) | Value::I32(_) | Value::I64(_) => Decimal::from(value.as_i64().unwrap_or_default()),
        Value::Decimal(d) => *d,
        Value::Bool(b) => Decimal::from(u8::from(*b)),
        // Debug formatting is the shortest decimal that round-trips.
        Value::F64(f) if f.is_finite() => {
            parse_decimal(&format!("{:?}", f)).ok_or_else(|| out_of_range(format!("{:?}", f), redshift_type))?
        }
        Value::F64(f) => return Err(out_of_range(format!("{:?}", f), redshift_type)),
        Value::Text(s) => parse_decimal(s.trim()).ok_or_else(|| format!("'{}' is not a number", s))?,
        other => return Err(cannot_convert(other, redshift_type)),
    };

    let dp = scale.min(DECIMAL_MAX_SCALE);
    let mut quantized = original.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    quantized.rescale(dp);

    // Bounds of 10^29 and beyond exceed what a Decimal can hold.
    let digits = precision.saturating_sub(scale);
    if digits <= DECIMAL_MAX_SCALE {
        let bound = Decimal::from_i128_with_scale(10i128.pow(digits), 0);
        if quantized.abs() >= bound {
            return Err(out_of_range(quantized, redshift_type));
        }
    }

    if quantized.is_zero() {
        if !original.is_zero() {
            return Err(format!(
                "'{}' is too small for type '{}' and would be stored as zero",
                original, redshift_type
            ));
        }
        quantized.set_sign_positive(true);
    }

    Ok(quantized.to_string())
}

fn encode_boolean(value: &Value<'_>) -> LiteralResult {
    let b = match value {
        Value::Bool(b) => *b,
        Value::I16(_) | Value::I32(_) | Value::I64(_) => match value.as_i64() {
            Some(0) => false,
            Some(1) => true,
            _ => return Err(format!("'{}' is not a boolean value", value.as_i64().unwrap_or_default())),
        },
        other => return Err(cannot_convert(other, RedshiftType::Boolean)),
    };
    Ok(if b { "TRUE" } else { "FALSE" }.to_string())
}

/// Render any non-NULL value as text for a character column.
fn value_as_text<'a>(value: &'a Value<'_>) -> std::result::Result<Cow<'a, str>, String> {
    Ok(match value {
        Value::Text(s) => Cow::Borrowed(s.as_ref()),
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => Cow::Borrowed(s),
            Err(_) => {
                return Err(format!(
                    "'{}' cannot be converted to UTF-8",
                    String::from_utf8_lossy(b)
                ))
            }
        },
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::I16(_) | Value::I32(_) | Value::I64(_) => {
            Cow::Owned(value.as_i64().unwrap_or_default().to_string())
        }
        Value::F64(f) => Cow::Owned(format!("{:?}", f)),
        Value::Decimal(d) => Cow::Owned(d.to_string()),
        Value::Date(d) => Cow::Owned(d.format("%Y-%m-%d").to_string()),
        Value::Time(t) => Cow::Owned(t.format("%H:%M:%S%.f").to_string()),
        Value::TimeTz(t) => Cow::Owned(format!("{}+0000", t.format("%H:%M:%S%.f"))),
        Value::DateTime(dt) => Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::DateTimeTz(dt) => Cow::Owned(dt.format("%Y-%m-%d %H:%M:%S%.f%z").to_string()),
        Value::Json(j) => match j.as_ref() {
            serde_json::Value::String(s) => Cow::Owned(s.clone()),
            other => Cow::Owned(other.to_string()),
        },
        Value::Null => Cow::Borrowed(""),
    })
}

/// Check length and character-set limits of a text value.
fn check_text(redshift_type: &RedshiftType, text: &str) -> std::result::Result<(), String> {
    if !redshift_type.allows_multibyte() && !text.is_ascii() {
        return Err("multibyte characters must not be included".to_string());
    }
    if let Some(max) = redshift_type.max_length() {
        if text.len() > max {
            return Err(format!("'{}' exceeds length ({})", text, max));
        }
    }
    Ok(())
}

/// Quote and escape text for a single-quoted literal.
///
/// CR and CRLF become LF before escaping.
pub fn quote_text(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(normalized.len() + 2);
    out.push('\'');
    for c in normalized.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn unparsable(s: &str, redshift_type: RedshiftType) -> String {
    format!("cannot parse '{}' as {}", s, redshift_type)
}

fn encode_date(value: &Value<'_>) -> LiteralResult {
    let d: NaiveDate = match value {
        Value::Date(d) => *d,
        Value::DateTime(dt) => dt.date(),
        Value::DateTimeTz(dt) => dt.date_naive(),
        Value::Text(s) => temporal::parse_date(s)
            .or_else(|| temporal::parse_timestamp(s).map(|dt| dt.date()))
            .ok_or_else(|| unparsable(s, RedshiftType::Date))?,
        other => return Err(cannot_convert(other, RedshiftType::Date)),
    };
    Ok(format!("'{}'", d.format("%Y-%m-%d")))
}

fn encode_timestamp(value: &Value<'_>) -> LiteralResult {
    let dt: NaiveDateTime = match value {
        Value::DateTime(dt) => *dt,
        Value::DateTimeTz(dt) => dt.naive_utc(),
        Value::Date(d) => d.and_time(NaiveTime::MIN),
        Value::Text(s) => temporal::parse_timestamp(s)
            .or_else(|| temporal::parse_timestamptz(s).map(|dt| dt.naive_utc()))
            .ok_or_else(|| unparsable(s, RedshiftType::TimeStamp))?,
        other => return Err(cannot_convert(other, RedshiftType::TimeStamp)),
    };
    Ok(format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f")))
}

fn encode_timestamptz(value: &Value<'_>) -> LiteralResult {
    let dt: DateTime<Utc> = match value {
        Value::DateTimeTz(dt) => *dt,
        Value::DateTime(dt) => Utc.from_utc_datetime(dt),
        Value::Date(d) => Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)),
        Value::Text(s) => {
            temporal::parse_timestamptz(s).ok_or_else(|| unparsable(s, RedshiftType::TimeStampTz))?
        }
        other => return Err(cannot_convert(other, RedshiftType::TimeStampTz)),
    };
    Ok(format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.f%z")))
}

fn encode_time(value: &Value<'_>) -> LiteralResult {
    let t: NaiveTime = match value {
        Value::Time(t) | Value::TimeTz(t) => *t,
        Value::DateTime(dt) => dt.time(),
        Value::DateTimeTz(dt) => dt.time(),
        Value::Text(s) => temporal::parse_time(s).ok_or_else(|| unparsable(s, RedshiftType::Time))?,
        other => return Err(cannot_convert(other, RedshiftType::Time)),
    };
    Ok(format!("'{}'", t.format("%H:%M:%S%.f")))
}

fn encode_timetz(value: &Value<'_>) -> LiteralResult {
    let t: NaiveTime = match value {
        Value::TimeTz(t) | Value::Time(t) => *t,
        Value::DateTimeTz(dt) => dt.time(),
        Value::DateTime(dt) => dt.time(),
        Value::Text(s) => temporal::parse_timetz(s).ok_or_else(|| unparsable(s, RedshiftType::TimeTz))?,
        other => return Err(cannot_convert(other, RedshiftType::TimeTz)),
    };
    Ok(format!("'{}+0000'", t.format("%H:%M:%S%.f")))
}

fn unsupported_super(kind: &str) -> String {
    format!("unsupported datatype {} for SUPER type", kind)
}

fn super_bool(b: bool) -> String {
    if b { "TRUE" } else { "FALSE" }.to_string()
}

fn encode_super(value: &Value<'_>) -> LiteralResult {
    match value {
        Value::I16(_) | Value::I32(_) | Value::I64(_) => {
            Ok(value.as_i64().unwrap_or_default().to_string())
        }
        Value::F64(f) if f.is_finite() => Ok(format!("{:?}", f)),
        Value::Decimal(d) => Ok(d.to_string()),
        Value::Bool(b) => Ok(super_bool(*b)),
        Value::Text(s) => Ok(quote_text(s)),
        Value::Json(j) => match j.as_ref() {
            serde_json::Value::Null => Ok("NULL".to_string()),
            serde_json::Value::Number(n) => Ok(n.to_string()),
            serde_json::Value::String(s) => Ok(quote_text(s)),
            serde_json::Value::Bool(b) => Ok(super_bool(*b)),
            nested => Ok(format!("JSON_PARSE({})", quote_text(&nested.to_string()))),
        },
        other => Err(unsupported_super(other.kind_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn numeric(p: u8, s: u8) -> RedshiftType {
        RedshiftType::Numeric { precision: p, scale: s }
    }

    fn text(s: &str) -> Value<'_> {
        Value::Text(Cow::Borrowed(s))
    }

    #[test]
    fn test_null_and_nan() {
        assert_eq!(encode_value(&RedshiftType::Integer, &Value::Null).unwrap(), "NULL");
        assert_eq!(encode_value(&RedshiftType::Real, &Value::F64(f64::NAN)).unwrap(), "NULL");
    }

    #[test]
    fn test_integer_family() {
        assert_eq!(encode_value(&RedshiftType::SmallInt, &Value::I64(32767)).unwrap(), "32767");
        assert!(encode_value(&RedshiftType::SmallInt, &Value::I64(32768)).is_err());
        assert!(encode_value(&RedshiftType::Integer, &Value::I64(-2147483649)).is_err());
        assert_eq!(encode_value(&RedshiftType::BigInt, &Value::I64(i64::MIN)).unwrap(), i64::MIN.to_string());
        assert_eq!(encode_value(&RedshiftType::Integer, &Value::F64(3.0)).unwrap(), "3");
        assert!(encode_value(&RedshiftType::Integer, &Value::F64(3.5)).is_err());
        assert_eq!(encode_value(&RedshiftType::Integer, &Value::Bool(true)).unwrap(), "1");
        assert_eq!(encode_value(&RedshiftType::Integer, &text(" 42 ")).unwrap(), "42");
        assert!(encode_value(&RedshiftType::Integer, &text("4x")).is_err());
    }

    #[test]
    fn test_float_range() {
        assert_eq!(encode_value(&RedshiftType::DoublePrecision, &Value::F64(1.5)).unwrap(), "1.5");
        assert_eq!(encode_value(&RedshiftType::DoublePrecision, &Value::F64(0.0)).unwrap(), "0.0");
        assert_eq!(encode_value(&RedshiftType::DoublePrecision, &Value::I64(2)).unwrap(), "2.0");
        assert!(encode_value(&RedshiftType::DoublePrecision, &Value::F64(f64::INFINITY)).is_err());
        assert!(encode_value(&RedshiftType::DoublePrecision, &Value::F64(1e-310)).is_err());
        assert!(encode_value(&RedshiftType::Real, &Value::F64(3.5e38)).is_err());
        assert!(encode_value(&RedshiftType::Real, &Value::F64(1e-39)).is_err());
        assert_eq!(encode_value(&RedshiftType::Real, &Value::F64(1e30)).unwrap(), "1e30");
    }

    #[test]
    fn test_numeric_boundaries() {
        let t = numeric(8, 2);
        let err = encode_value(&t, &Value::F64(999999.995)).unwrap_err();
        assert!(err.contains("out of range"));
        let err = encode_value(&t, &Value::F64(0.001)).unwrap_err();
        assert!(err.contains("too small"));
        assert_eq!(encode_value(&t, &Value::F64(999999.994)).unwrap(), "999999.99");
        assert_eq!(encode_value(&t, &Value::F64(0.005)).unwrap(), "0.01");
        assert_eq!(encode_value(&t, &Value::F64(-0.005)).unwrap(), "-0.01");
        assert_eq!(encode_value(&t, &Value::F64(0.0)).unwrap(), "0.00");
        assert_eq!(encode_value(&t, &Value::I64(12)).unwrap(), "12.00");
        assert_eq!(encode_value(&t, &text("123.45")).unwrap(), "123.45");
        assert_eq!(
            encode_value(&t, &Value::Decimal("123.45".parse().unwrap())).unwrap(),
            "123.45"
        );
    }

    #[test]
    fn test_numeric_default_scale() {
        let t = RedshiftType::default_numeric();
        assert_eq!(encode_value(&t, &Value::F64(2.5)).unwrap(), "3");
        assert!(encode_value(&t, &Value::F64(1e18)).is_err());
        assert!(encode_value(&t, &Value::F64(0.4)).is_err());
    }

    #[test]
    fn test_boolean() {
        assert_eq!(encode_value(&RedshiftType::Boolean, &Value::Bool(true)).unwrap(), "TRUE");
        assert_eq!(encode_value(&RedshiftType::Boolean, &Value::I64(0)).unwrap(), "FALSE");
        assert!(encode_value(&RedshiftType::Boolean, &Value::I64(2)).is_err());
        assert!(encode_value(&RedshiftType::Boolean, &text("true")).is_err());
    }

    #[test]
    fn test_text_escapes() {
        assert_eq!(
            encode_value(&RedshiftType::VarChar(256), &text("it's a\\b\r\nc\td")).unwrap(),
            "'it\\'s a\\\\b\\nc\\td'"
        );
        assert_eq!(quote_text("\u{8}\u{c}\r"), "'\\b\\f\\n'");
    }

    #[test]
    fn test_text_limits() {
        let long = "x".repeat(61);
        let err = encode_value(&RedshiftType::VarChar(60), &text(&long)).unwrap_err();
        assert!(err.contains("exceeds length (60)"));
        assert!(encode_value(&RedshiftType::VarChar(60), &text(&"x".repeat(60))).is_ok());

        // Three bytes each.
        assert!(encode_value(&RedshiftType::VarChar(6), &text("日本")).is_ok());
        assert!(encode_value(&RedshiftType::VarChar(5), &text("日本")).is_err());

        let err = encode_value(&RedshiftType::Char(10), &text("é")).unwrap_err();
        assert!(err.contains("multibyte"));
        assert!(encode_value(&RedshiftType::BPChar(256), &text("ü")).is_err());

        assert!(encode_value(&RedshiftType::Text, &text(&"y".repeat(257))).is_err());
        assert!(encode_value(&RedshiftType::Geometry, &text(&"0".repeat(100_000))).is_ok());
    }

    #[test]
    fn test_bytes_must_be_utf8() {
        let ok = Value::Bytes(Cow::Borrowed(&b"abc"[..]));
        assert_eq!(encode_value(&RedshiftType::VarChar(10), &ok).unwrap(), "'abc'");
        let bad = Value::Bytes(Cow::Borrowed(&[0xffu8, 0xfe][..]));
        let err = encode_value(&RedshiftType::VarChar(10), &bad).unwrap_err();
        assert!(err.contains("UTF-8"));
    }

    #[test]
    fn test_temporal_literals() {
        let dt = NaiveDate::from_ymd_opt(2021, 7, 2).unwrap().and_hms_opt(10, 0, 0).unwrap();
        assert_eq!(encode_value(&RedshiftType::Date, &Value::DateTime(dt)).unwrap(), "'2021-07-02'");
        assert_eq!(
            encode_value(&RedshiftType::TimeStamp, &Value::DateTime(dt)).unwrap(),
            "'2021-07-02 10:00:00'"
        );
        assert_eq!(
            encode_value(&RedshiftType::TimeStampTz, &Value::DateTimeTz(Utc.from_utc_datetime(&dt))).unwrap(),
            "'2021-07-02 10:00:00+0000'"
        );
        assert_eq!(
            encode_value(&RedshiftType::TimeStampTz, &text("2021-07-02 19:00:00+09:00")).unwrap(),
            "'2021-07-02 10:00:00+0000'"
        );
        let t = NaiveTime::from_hms_micro_opt(1, 2, 3, 456).unwrap();
        assert_eq!(encode_value(&RedshiftType::Time, &Value::Time(t)).unwrap(), "'01:02:03.000456'");
        assert_eq!(encode_value(&RedshiftType::TimeTz, &Value::TimeTz(t)).unwrap(), "'01:02:03.000456+0000'");
        assert!(encode_value(&RedshiftType::Date, &text("not a date")).is_err());
        assert!(encode_value(&RedshiftType::Date, &Value::I64(3)).is_err());
    }

    #[test]
    fn test_super() {
        let t = RedshiftType::Super;
        assert_eq!(encode_value(&t, &Value::I64(3)).unwrap(), "3");
        assert_eq!(encode_value(&t, &Value::F64(1.5)).unwrap(), "1.5");
        assert_eq!(encode_value(&t, &text("a'b")).unwrap(), "'a\\'b'");
        assert_eq!(
            encode_value(&t, &Value::Json(Cow::Owned(json!({"a": [1, 2]})))).unwrap(),
            "JSON_PARSE('{\"a\":[1,2]}')"
        );
        assert_eq!(encode_value(&t, &Value::Json(Cow::Owned(json!(null)))).unwrap(), "NULL");

        assert_eq!(encode_value(&t, &Value::Bool(true)).unwrap(), "TRUE");
        assert_eq!(encode_value(&t, &Value::Json(Cow::Owned(json!(false)))).unwrap(), "FALSE");

        let err = encode_value(&t, &Value::F64(f64::INFINITY)).unwrap_err();
        assert!(err.contains("SUPER"));
        let err = encode_value(&t, &Value::Bytes(Cow::Borrowed(&b"x"[..]))).unwrap_err();
        assert!(err.contains("unsupported datatype bytes for SUPER type"));
        assert!(encode_value(&t, &Value::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())).is_err());
    }
}
