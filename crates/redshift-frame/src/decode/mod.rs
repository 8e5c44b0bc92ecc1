//! Decoding of Data API statement results into typed tables.
//!
//! Result cells arrive as single-field wrappers (`{"longValue": 210}`,
//! `{"isNull": true}`). Each column is decoded in two passes: every cell is
//! parsed into a [`Value`] according to the column's Redshift type, then the
//! native container is chosen from whether any NULL was seen.

pub mod temporal;

use std::borrow::Cow;
use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::catalog::{self, RedshiftType};
use crate::core::{Column, ColumnData, TypedTable, Value};
use crate::error::{RedshiftError, Result};

/// One result cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCell", into = "RawCell")]
pub enum Cell {
    Null,
    StringValue(String),
    DoubleValue(f64),
    BooleanValue(bool),
    LongValue(i64),
}

/// Wire form of a cell: at most one field is populated.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_null: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    double_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    boolean_value: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    long_value: Option<i64>,
}

impl TryFrom<RawCell> for Cell {
    type Error = String;

    fn try_from(raw: RawCell) -> std::result::Result<Self, String> {
        let mut cells = Vec::with_capacity(1);
        if raw.is_null == Some(true) {
            cells.push(Cell::Null);
        }
        if let Some(v) = raw.string_value {
            cells.push(Cell::StringValue(v));
        }
        if let Some(v) = raw.double_value {
            cells.push(Cell::DoubleValue(v));
        }
        if let Some(v) = raw.boolean_value {
            cells.push(Cell::BooleanValue(v));
        }
        if let Some(v) = raw.long_value {
            cells.push(Cell::LongValue(v));
        }

        match cells.len() {
            1 => Ok(cells.remove(0)),
            0 => Err("result cell has no populated field".to_string()),
            n => Err(format!("result cell has {} populated fields, expected one", n)),
        }
    }
}

impl From<Cell> for RawCell {
    fn from(cell: Cell) -> Self {
        match cell {
            Cell::Null => RawCell {
                is_null: Some(true),
                ..Default::default()
            },
            Cell::StringValue(v) => RawCell {
                string_value: Some(v),
                ..Default::default()
            },
            Cell::DoubleValue(v) => RawCell {
                double_value: Some(v),
                ..Default::default()
            },
            Cell::BooleanValue(v) => RawCell {
                boolean_value: Some(v),
                ..Default::default()
            },
            Cell::LongValue(v) => RawCell {
                long_value: Some(v),
                ..Default::default()
            },
        }
    }
}

impl Cell {
    fn kind_name(&self) -> &'static str {
        match self {
            Cell::Null => "null",
            Cell::StringValue(_) => "stringValue",
            Cell::DoubleValue(_) => "doubleValue",
            Cell::BooleanValue(_) => "booleanValue",
            Cell::LongValue(_) => "longValue",
        }
    }
}

/// Column metadata as returned with a statement result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub name: String,
    pub type_name: String,
    /// Accepts a boolean or the Data API's integer flag (0 = no nulls).
    #[serde(default, deserialize_with = "deserialize_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub precision: i64,
    #[serde(default)]
    pub scale: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
}

impl ColumnMetadata {
    /// Metadata with just a name and type.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
            precision: 0,
            scale: 0,
            length: None,
            label: None,
            schema_name: None,
            table_name: None,
        }
    }

    /// Set precision and scale.
    pub fn with_precision(mut self, precision: i64, scale: i64) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// The Redshift type this column declares.
    pub fn redshift_type(&self) -> Result<RedshiftType> {
        Ok(catalog::resolve(&self.type_name)?.with_metadata(self.precision, self.scale))
    }
}

fn deserialize_nullable<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}

/// One page of a `GetStatementResult` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatementResult {
    #[serde(default)]
    pub column_metadata: Vec<ColumnMetadata>,
    #[serde(default)]
    pub records: Vec<Vec<Cell>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_num_rows: Option<i64>,
}

/// Decode a single page of results.
pub fn decode(metadata: &[ColumnMetadata], records: &[Vec<Cell>]) -> Result<TypedTable> {
    let rows: Vec<&[Cell]> = records.iter().map(Vec::as_slice).collect();
    decode_rows(metadata, &rows)
}

/// Decode a paginated result. Column metadata is taken from the first page.
pub fn decode_pages(pages: &[StatementResult]) -> Result<TypedTable> {
    let Some(first) = pages.first() else {
        return Ok(TypedTable::new());
    };
    let rows: Vec<&[Cell]> = pages
        .iter()
        .flat_map(|page| page.records.iter().map(Vec::as_slice))
        .collect();
    decode_rows(&first.column_metadata, &rows)
}

fn decode_rows(metadata: &[ColumnMetadata], rows: &[&[Cell]]) -> Result<TypedTable> {
    let mut seen = HashSet::new();
    for meta in metadata {
        if !seen.insert(meta.name.as_str()) {
            return Err(RedshiftError::decode(
                &meta.name,
                0,
                "duplicate result column name",
            ));
        }
    }

    for (row, record) in rows.iter().enumerate() {
        if record.len() != metadata.len() {
            let column = metadata
                .get(record.len())
                .or_else(|| metadata.last())
                .map_or("", |m| m.name.as_str());
            return Err(RedshiftError::decode(
                column,
                row,
                format!("row has {} cells, expected {}", record.len(), metadata.len()),
            ));
        }
    }

    let mut table = TypedTable::new();
    for (idx, meta) in metadata.iter().enumerate() {
        let redshift_type = meta.redshift_type()?;

        let values = rows
            .iter()
            .enumerate()
            .map(|(row, record)| {
                decode_cell(&redshift_type, &record[idx])
                    .map_err(|reason| RedshiftError::decode(&meta.name, row, reason))
            })
            .collect::<Result<Vec<_>>>()?;

        let has_nulls = values.iter().any(Value::is_null);
        let kind = redshift_type.native_container(has_nulls);
        let data = ColumnData::from_values(kind, values)
            .map_err(|(row, reason)| RedshiftError::decode(&meta.name, row, reason))?;

        debug!(
            "Decoded column '{}' ({}) into {} container, {} rows",
            meta.name,
            redshift_type,
            kind,
            data.len()
        );
        table.push_column(Column::new(meta.name.clone(), data))?;
    }

    Ok(table)
}

/// Decode one cell according to its column's Redshift type.
pub fn decode_cell(redshift_type: &RedshiftType, cell: &Cell) -> std::result::Result<Value<'static>, String> {
    if matches!(cell, Cell::Null) {
        return Ok(Value::Null);
    }

    let unexpected = || {
        format!(
            "{} is not a valid {} value",
            cell.kind_name(),
            redshift_type
        )
    };
    let malformed = |s: &str| format!("'{}' is not a valid {} value", s, redshift_type);

    match redshift_type {
        RedshiftType::SmallInt | RedshiftType::Integer | RedshiftType::BigInt => {
            let v = match cell {
                Cell::LongValue(v) => *v,
                Cell::StringValue(s) => s.trim().parse::<i64>().map_err(|_| malformed(s))?,
                Cell::DoubleValue(f) if f.is_finite() && f.fract() == 0.0 => {
                    if *f < i64::MIN as f64 || *f >= i64::MAX as f64 {
                        return Err(format!("{:?} is out of range for type '{}'", f, redshift_type));
                    }
                    *f as i64
                }
                _ => return Err(unexpected()),
            };
            let (min, max) = redshift_type.integer_range().unwrap_or((i64::MIN, i64::MAX));
            if v < min || v > max {
                return Err(format!("{} is out of range for type '{}'", v, redshift_type));
            }
            Ok(Value::I64(v))
        }
        RedshiftType::Real | RedshiftType::DoublePrecision => match cell {
            Cell::DoubleValue(f) => Ok(Value::F64(*f)),
            Cell::LongValue(v) => Ok(Value::F64(*v as f64)),
            Cell::StringValue(s) => s.trim().parse::<f64>().map(Value::F64).map_err(|_| malformed(s)),
            _ => Err(unexpected()),
        },
        RedshiftType::Numeric { .. } => match cell {
            Cell::StringValue(s) => {
                let s = s.trim();
                Decimal::from_str(s)
                    .or_else(|_| Decimal::from_scientific(s))
                    .map(Value::Decimal)
                    .map_err(|_| malformed(s))
            }
            Cell::LongValue(v) => Ok(Value::Decimal(Decimal::from(*v))),
            Cell::DoubleValue(f) => Decimal::try_from(*f)
                .map(Value::Decimal)
                .map_err(|_| format!("{} is not a valid {} value", f, redshift_type)),
            _ => Err(unexpected()),
        },
        RedshiftType::Boolean => match cell {
            Cell::BooleanValue(b) => Ok(Value::Bool(*b)),
            Cell::StringValue(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" => Ok(Value::Bool(true)),
                "false" | "f" => Ok(Value::Bool(false)),
                _ => Err(malformed(s)),
            },
            _ => Err(unexpected()),
        },
        RedshiftType::Char(_)
        | RedshiftType::BPChar(_)
        | RedshiftType::VarChar(_)
        | RedshiftType::Text
        | RedshiftType::Geometry => match cell {
            Cell::StringValue(s) => Ok(Value::Text(Cow::Owned(s.clone()))),
            _ => Err(unexpected()),
        },
        RedshiftType::Date => text_of(cell)
            .ok_or_else(unexpected)
            .and_then(|s| temporal::parse_date(s).map(Value::Date).ok_or_else(|| malformed(s))),
        RedshiftType::Time => text_of(cell)
            .ok_or_else(unexpected)
            .and_then(|s| temporal::parse_time(s).map(Value::Time).ok_or_else(|| malformed(s))),
        RedshiftType::TimeTz => text_of(cell)
            .ok_or_else(unexpected)
            .and_then(|s| temporal::parse_timetz(s).map(Value::TimeTz).ok_or_else(|| malformed(s))),
        RedshiftType::TimeStamp => text_of(cell).ok_or_else(unexpected).and_then(|s| {
            temporal::parse_timestamp(s)
                .map(Value::DateTime)
                .ok_or_else(|| malformed(s))
        }),
        RedshiftType::TimeStampTz => text_of(cell).ok_or_else(unexpected).and_then(|s| {
            temporal::parse_timestamptz(s)
                .map(Value::DateTimeTz)
                .ok_or_else(|| malformed(s))
        }),
        RedshiftType::Super => Ok(Value::Json(Cow::Owned(decode_super(cell)))),
    }
}

fn text_of(cell: &Cell) -> Option<&str> {
    match cell {
        Cell::StringValue(s) => Some(s.as_str()),
        _ => None,
    }
}

/// SUPER values are JSON text; anything that does not parse is kept as a string.
fn decode_super(cell: &Cell) -> serde_json::Value {
    match cell {
        Cell::Null => serde_json::Value::Null,
        Cell::StringValue(s) => serde_json::from_str(s).unwrap_or_else(|err| {
            warn!("SUPER value is not valid JSON ({}), keeping raw string", err);
            serde_json::Value::String(s.clone())
        }),
        Cell::DoubleValue(f) => {
            serde_json::Number::from_f64(*f).map_or_else(|| serde_json::Value::String(f.to_string()), serde_json::Value::Number)
        }
        Cell::BooleanValue(b) => serde_json::Value::Bool(*b),
        Cell::LongValue(v) => serde_json::Value::from(*v),
    }
}
