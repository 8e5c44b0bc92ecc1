//! The Redshift type catalog.
//!
//! A closed set of type descriptors, the aliases that name them, their
//! parameter rules and the native container each one decodes into. Tokens
//! follow the grammar `name[(p[, s])]`, matched case-insensitively.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::ContainerKind;
use crate::error::{RedshiftError, Result};

/// Default length of `CHAR` when none (or zero) is given.
pub const CHAR_DEFAULT_LENGTH: u16 = 1;
/// Default length of `BPCHAR`, `VARCHAR` and `TEXT`.
pub const VARCHAR_DEFAULT_LENGTH: u16 = 256;
/// Maximum declared length of `CHAR` and `BPCHAR`.
pub const CHAR_MAX_LENGTH: u16 = 4096;
/// Maximum declared length of `VARCHAR`.
pub const VARCHAR_MAX_LENGTH: u16 = 65535;
/// Default `NUMERIC` precision.
pub const NUMERIC_DEFAULT_PRECISION: u8 = 18;
/// Default `NUMERIC` scale.
pub const NUMERIC_DEFAULT_SCALE: u8 = 0;
/// Maximum `NUMERIC` precision.
pub const NUMERIC_MAX_PRECISION: u8 = 38;
/// Maximum `NUMERIC` scale.
pub const NUMERIC_MAX_SCALE: u8 = 37;

static TYPE_TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

fn type_token_regex() -> &'static Regex {
    TYPE_TOKEN_REGEX.get_or_init(|| {
        Regex::new(r"^([a-zA-Z0-9 ]*)(\(([0-9, ]*?)\))?$").expect("valid type token regex")
    })
}

/// The type family a descriptor belongs to, without parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    SmallInt,
    Integer,
    BigInt,
    Numeric,
    Real,
    DoublePrecision,
    Boolean,
    Char,
    BPChar,
    VarChar,
    Text,
    Date,
    TimeStamp,
    TimeStampTz,
    Time,
    TimeTz,
    Geometry,
    Super,
}

impl TypeTag {
    /// Every tag in catalog order.
    pub const ALL: [TypeTag; 18] = [
        TypeTag::SmallInt,
        TypeTag::Integer,
        TypeTag::BigInt,
        TypeTag::Numeric,
        TypeTag::Real,
        TypeTag::DoublePrecision,
        TypeTag::Boolean,
        TypeTag::Char,
        TypeTag::BPChar,
        TypeTag::VarChar,
        TypeTag::Text,
        TypeTag::Date,
        TypeTag::TimeStamp,
        TypeTag::TimeStampTz,
        TypeTag::Time,
        TypeTag::TimeTz,
        TypeTag::Geometry,
        TypeTag::Super,
    ];

    /// Upper-case names accepted for this tag.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            TypeTag::SmallInt => &["SMALLINT", "INT2"],
            TypeTag::Integer => &["INTEGER", "INT", "INT4"],
            TypeTag::BigInt => &["BIGINT", "INT8"],
            TypeTag::Numeric => &["DECIMAL", "NUMERIC"],
            TypeTag::Real => &["REAL", "FLOAT4"],
            TypeTag::DoublePrecision => &["DOUBLE PRECISION", "FLOAT8", "FLOAT"],
            TypeTag::Boolean => &["BOOLEAN", "BOOL"],
            TypeTag::Char => &["CHAR", "CHARACTER", "NCHAR"],
            TypeTag::BPChar => &["BPCHAR"],
            TypeTag::VarChar => &["VARCHAR", "CHARACTER VARYING", "NVARCHAR"],
            TypeTag::Text => &["TEXT"],
            TypeTag::Date => &["DATE"],
            TypeTag::TimeStamp => &["TIMESTAMP", "TIMESTAMP WITHOUT TIME ZONE"],
            TypeTag::TimeStampTz => &["TIMESTAMPTZ", "TIMESTAMP WITH TIME ZONE"],
            TypeTag::Time => &["TIME", "TIME WITHOUT TIME ZONE"],
            TypeTag::TimeTz => &["TIMETZ", "TIME WITH TIME ZONE"],
            TypeTag::Geometry => &["GEOMETRY"],
            TypeTag::Super => &["SUPER"],
        }
    }

    /// Canonical DDL name.
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::SmallInt => "SMALLINT",
            TypeTag::Integer => "INTEGER",
            TypeTag::BigInt => "BIGINT",
            TypeTag::Numeric => "NUMERIC",
            TypeTag::Real => "REAL",
            TypeTag::DoublePrecision => "DOUBLE PRECISION",
            TypeTag::Boolean => "BOOLEAN",
            TypeTag::Char => "CHAR",
            TypeTag::BPChar => "BPCHAR",
            TypeTag::VarChar => "VARCHAR",
            TypeTag::Text => "TEXT",
            TypeTag::Date => "DATE",
            TypeTag::TimeStamp => "TIMESTAMP",
            TypeTag::TimeStampTz => "TIMESTAMPTZ",
            TypeTag::Time => "TIME",
            TypeTag::TimeTz => "TIMETZ",
            TypeTag::Geometry => "GEOMETRY",
            TypeTag::Super => "SUPER",
        }
    }

    /// Look up a tag by alias. The name must already be upper-cased with
    /// single spaces between words.
    pub fn from_alias(name: &str) -> Option<TypeTag> {
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.aliases().contains(&name))
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully parameterized Redshift column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RedshiftType {
    SmallInt,
    Integer,
    BigInt,
    Numeric { precision: u8, scale: u8 },
    Real,
    DoublePrecision,
    Boolean,
    /// Fixed-length single-byte text.
    Char(u16),
    /// Blank-padded text.
    BPChar(u16),
    /// Variable-length text, multibyte allowed.
    VarChar(u16),
    /// Alias of `VARCHAR(256)`.
    Text,
    Date,
    TimeStamp,
    TimeStampTz,
    Time,
    TimeTz,
    Geometry,
    Super,
}

impl RedshiftType {
    /// The parameter-free family of this type.
    pub fn tag(&self) -> TypeTag {
        match self {
            RedshiftType::SmallInt => TypeTag::SmallInt,
            RedshiftType::Integer => TypeTag::Integer,
            RedshiftType::BigInt => TypeTag::BigInt,
            RedshiftType::Numeric { .. } => TypeTag::Numeric,
            RedshiftType::Real => TypeTag::Real,
            RedshiftType::DoublePrecision => TypeTag::DoublePrecision,
            RedshiftType::Boolean => TypeTag::Boolean,
            RedshiftType::Char(_) => TypeTag::Char,
            RedshiftType::BPChar(_) => TypeTag::BPChar,
            RedshiftType::VarChar(_) => TypeTag::VarChar,
            RedshiftType::Text => TypeTag::Text,
            RedshiftType::Date => TypeTag::Date,
            RedshiftType::TimeStamp => TypeTag::TimeStamp,
            RedshiftType::TimeStampTz => TypeTag::TimeStampTz,
            RedshiftType::Time => TypeTag::Time,
            RedshiftType::TimeTz => TypeTag::TimeTz,
            RedshiftType::Geometry => TypeTag::Geometry,
            RedshiftType::Super => TypeTag::Super,
        }
    }

    /// `NUMERIC(18,0)`.
    pub fn default_numeric() -> Self {
        RedshiftType::Numeric {
            precision: NUMERIC_DEFAULT_PRECISION,
            scale: NUMERIC_DEFAULT_SCALE,
        }
    }

    /// Build a descriptor from a tag and its numeric parameters.
    pub fn from_parts(tag: TypeTag, params: &[u32]) -> Result<Self> {
        let token = || render_token(tag, params);
        match tag {
            TypeTag::Numeric => {
                let (precision, scale) = match params {
                    [] => (
                        u32::from(NUMERIC_DEFAULT_PRECISION),
                        u32::from(NUMERIC_DEFAULT_SCALE),
                    ),
                    [p] => (*p, 0),
                    [p, s] => (*p, *s),
                    _ => {
                        return Err(RedshiftError::invalid_type(
                            token(),
                            "NUMERIC takes at most two parameters",
                        ))
                    }
                };
                numeric(precision, scale).map_err(|reason| RedshiftError::invalid_type(token(), reason))
            }
            TypeTag::Char | TypeTag::BPChar | TypeTag::VarChar => {
                let requested = match params {
                    [] => 0,
                    [n] => *n,
                    _ => {
                        return Err(RedshiftError::invalid_type(
                            token(),
                            format!("{} takes at most one parameter", tag),
                        ))
                    }
                };
                char_type(tag, requested).map_err(|reason| RedshiftError::invalid_type(token(), reason))
            }
            _ if !params.is_empty() => Err(RedshiftError::invalid_type(
                token(),
                format!("{} does not take parameters", tag),
            )),
            TypeTag::SmallInt => Ok(RedshiftType::SmallInt),
            TypeTag::Integer => Ok(RedshiftType::Integer),
            TypeTag::BigInt => Ok(RedshiftType::BigInt),
            TypeTag::Real => Ok(RedshiftType::Real),
            TypeTag::DoublePrecision => Ok(RedshiftType::DoublePrecision),
            TypeTag::Boolean => Ok(RedshiftType::Boolean),
            TypeTag::Text => Ok(RedshiftType::Text),
            TypeTag::Date => Ok(RedshiftType::Date),
            TypeTag::TimeStamp => Ok(RedshiftType::TimeStamp),
            TypeTag::TimeStampTz => Ok(RedshiftType::TimeStampTz),
            TypeTag::Time => Ok(RedshiftType::Time),
            TypeTag::TimeTz => Ok(RedshiftType::TimeTz),
            TypeTag::Geometry => Ok(RedshiftType::Geometry),
            TypeTag::Super => Ok(RedshiftType::Super),
        }
    }

    /// Refine a descriptor with precision and scale reported by column
    /// metadata. Values outside the type's bounds are ignored.
    pub fn with_metadata(self, precision: i64, scale: i64) -> Self {
        match self {
            RedshiftType::Numeric { .. } if precision > 0 => {
                match (u32::try_from(precision), u32::try_from(scale.max(0))) {
                    (Ok(p), Ok(s)) => numeric(p, s).unwrap_or(self),
                    _ => self,
                }
            }
            RedshiftType::Char(_) | RedshiftType::BPChar(_) | RedshiftType::VarChar(_)
                if precision > 0 =>
            {
                u32::try_from(precision)
                    .ok()
                    .and_then(|n| char_type(self.tag(), n).ok())
                    .unwrap_or(self)
            }
            other => other,
        }
    }

    /// Maximum encoded byte length for text types, `None` when unbounded.
    pub fn max_length(&self) -> Option<usize> {
        match self {
            RedshiftType::Char(n) | RedshiftType::BPChar(n) | RedshiftType::VarChar(n) => {
                Some(usize::from(*n))
            }
            RedshiftType::Text => Some(usize::from(VARCHAR_DEFAULT_LENGTH)),
            _ => None,
        }
    }

    /// Inclusive value range for the integer family.
    pub fn integer_range(&self) -> Option<(i64, i64)> {
        match self {
            RedshiftType::SmallInt => Some((i64::from(i16::MIN), i64::from(i16::MAX))),
            RedshiftType::Integer => Some((i64::from(i32::MIN), i64::from(i32::MAX))),
            RedshiftType::BigInt => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Whether text values may contain multibyte characters.
    pub fn allows_multibyte(&self) -> bool {
        !matches!(self, RedshiftType::Char(_) | RedshiftType::BPChar(_))
    }

    /// The native container used for a decoded column of this type.
    pub fn native_container(&self, has_nulls: bool) -> ContainerKind {
        match self {
            RedshiftType::SmallInt | RedshiftType::Integer | RedshiftType::BigInt if has_nulls => {
                ContainerKind::NullableInt64
            }
            RedshiftType::SmallInt => ContainerKind::Int16,
            RedshiftType::Integer => ContainerKind::Int32,
            RedshiftType::BigInt => ContainerKind::Int64,
            RedshiftType::Real | RedshiftType::DoublePrecision => ContainerKind::Float64,
            RedshiftType::Numeric { .. } => ContainerKind::Decimal,
            RedshiftType::Boolean if has_nulls => ContainerKind::NullableBoolean,
            RedshiftType::Boolean => ContainerKind::Boolean,
            RedshiftType::Char(_)
            | RedshiftType::BPChar(_)
            | RedshiftType::VarChar(_)
            | RedshiftType::Text
            | RedshiftType::Geometry => ContainerKind::Utf8,
            RedshiftType::Date => ContainerKind::Date,
            RedshiftType::Time => ContainerKind::Time,
            RedshiftType::TimeTz => ContainerKind::TimeTz,
            RedshiftType::TimeStamp => ContainerKind::Timestamp,
            RedshiftType::TimeStampTz => ContainerKind::TimestampTz,
            RedshiftType::Super => ContainerKind::Json,
        }
    }
}

fn numeric(precision: u32, scale: u32) -> std::result::Result<RedshiftType, String> {
    if precision == 0 || precision > u32::from(NUMERIC_MAX_PRECISION) {
        return Err(format!(
            "precision {} is outside 1..={}",
            precision, NUMERIC_MAX_PRECISION
        ));
    }
    if scale > precision {
        return Err(format!(
            "scale {} is greater than precision {}",
            scale, precision
        ));
    }
    if scale > u32::from(NUMERIC_MAX_SCALE) {
        return Err(format!("scale {} exceeds {}", scale, NUMERIC_MAX_SCALE));
    }
    // Both bounds checked above, so the narrowing cannot truncate.
    Ok(RedshiftType::Numeric {
        precision: precision as u8,
        scale: scale as u8,
    })
}

fn char_type(tag: TypeTag, requested: u32) -> std::result::Result<RedshiftType, String> {
    let (default, max) = match tag {
        TypeTag::Char => (CHAR_DEFAULT_LENGTH, CHAR_MAX_LENGTH),
        TypeTag::BPChar => (VARCHAR_DEFAULT_LENGTH, CHAR_MAX_LENGTH),
        _ => (VARCHAR_DEFAULT_LENGTH, VARCHAR_MAX_LENGTH),
    };
    let length = if requested == 0 {
        default
    } else {
        u16::try_from(requested)
            .ok()
            .filter(|n| *n <= max)
            .ok_or_else(|| format!("The length '{}' is too long for '{}'", requested, tag))?
    };
    Ok(match tag {
        TypeTag::Char => RedshiftType::Char(length),
        TypeTag::BPChar => RedshiftType::BPChar(length),
        _ => RedshiftType::VarChar(length),
    })
}

fn render_token(tag: TypeTag, params: &[u32]) -> String {
    if params.is_empty() {
        tag.name().to_string()
    } else {
        let params: Vec<String> = params.iter().map(u32::to_string).collect();
        format!("{}({})", tag.name(), params.join(","))
    }
}

/// Split a dtype token into its type tag and numeric parameters.
///
/// The name is matched case-insensitively after trimming and collapsing
/// internal whitespace, so `" double   precision "` names `DOUBLE PRECISION`.
pub fn parse_parametrized(token: &str) -> Result<(TypeTag, Vec<u32>)> {
    let not_found = || RedshiftError::invalid_type(token, format!("Redshift type not found for '{}'", token));

    let caps = type_token_regex().captures(token.trim()).ok_or_else(not_found)?;
    let name = caps
        .get(1)
        .map_or("", |m| m.as_str())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    let tag = TypeTag::from_alias(&name).ok_or_else(not_found)?;

    let params = match caps.get(3) {
        Some(args) if !args.as_str().trim().is_empty() => args
            .as_str()
            .split(',')
            .map(|arg| {
                arg.trim().parse::<u32>().map_err(|_| {
                    RedshiftError::invalid_type(token, format!("invalid type parameter '{}'", arg.trim()))
                })
            })
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };

    Ok((tag, params))
}

/// Resolve a dtype token to a descriptor.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(resolve("varchar(60)")?, RedshiftType::VarChar(60));
/// assert_eq!(resolve("int4")?, RedshiftType::Integer);
/// ```
pub fn resolve(token: &str) -> Result<RedshiftType> {
    let (tag, params) = parse_parametrized(token)?;
    RedshiftType::from_parts(tag, &params)
}

impl FromStr for RedshiftType {
    type Err = RedshiftError;

    fn from_str(s: &str) -> Result<Self> {
        resolve(s)
    }
}

impl TryFrom<String> for RedshiftType {
    type Error = RedshiftError;

    fn try_from(s: String) -> Result<Self> {
        resolve(&s)
    }
}

impl From<RedshiftType> for String {
    fn from(t: RedshiftType) -> Self {
        t.to_string()
    }
}

impl fmt::Display for RedshiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedshiftType::Numeric { precision, scale }
                if *precision == NUMERIC_DEFAULT_PRECISION && *scale == NUMERIC_DEFAULT_SCALE =>
            {
                f.write_str("NUMERIC")
            }
            RedshiftType::Numeric { precision, scale } => write!(f, "NUMERIC({},{})", precision, scale),
            RedshiftType::Char(n) if *n == CHAR_DEFAULT_LENGTH => f.write_str("CHAR"),
            RedshiftType::Char(n) => write!(f, "CHAR({})", n),
            RedshiftType::BPChar(n) if *n == VARCHAR_DEFAULT_LENGTH => f.write_str("BPCHAR"),
            RedshiftType::BPChar(n) => write!(f, "BPCHAR({})", n),
            RedshiftType::VarChar(n) if *n == VARCHAR_DEFAULT_LENGTH => f.write_str("VARCHAR"),
            RedshiftType::VarChar(n) => write!(f, "VARCHAR({})", n),
            other => f.write_str(other.tag().name()),
        }
    }
}
