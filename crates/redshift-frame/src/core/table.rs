//! Columnar in-memory tables.
//!
//! A [`TypedTable`] is an ordered list of uniquely named columns. Every column
//! stores its values in one [`ColumnData`] container, and all columns have the
//! same number of rows.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::error::{RedshiftError, Result};

/// The kind of native container a column uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Int16,
    Int32,
    Int64,
    NullableInt64,
    Float64,
    Decimal,
    Boolean,
    NullableBoolean,
    Utf8,
    Binary,
    Date,
    Time,
    TimeTz,
    Timestamp,
    TimestampTz,
    Json,
    Mixed,
}

impl ContainerKind {
    /// Whether the container can hold NULL.
    pub fn is_nullable(self) -> bool {
        !matches!(
            self,
            ContainerKind::Int16 | ContainerKind::Int32 | ContainerKind::Int64 | ContainerKind::Boolean
        )
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContainerKind::Int16 => "int16",
            ContainerKind::Int32 => "int32",
            ContainerKind::Int64 => "int64",
            ContainerKind::NullableInt64 => "nullable_int64",
            ContainerKind::Float64 => "float64",
            ContainerKind::Decimal => "decimal",
            ContainerKind::Boolean => "boolean",
            ContainerKind::NullableBoolean => "nullable_boolean",
            ContainerKind::Utf8 => "utf8",
            ContainerKind::Binary => "binary",
            ContainerKind::Date => "date",
            ContainerKind::Time => "time",
            ContainerKind::TimeTz => "timetz",
            ContainerKind::Timestamp => "timestamp",
            ContainerKind::TimestampTz => "timestamptz",
            ContainerKind::Json => "json",
            ContainerKind::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

/// Typed storage for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    NullableInt64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Decimal(Vec<Option<Decimal>>),
    Boolean(Vec<bool>),
    NullableBoolean(Vec<Option<bool>>),
    Utf8(Vec<Option<String>>),
    Binary(Vec<Option<Vec<u8>>>),
    Date(Vec<Option<NaiveDate>>),
    Time(Vec<Option<NaiveTime>>),
    /// Times of day normalized to UTC.
    TimeTz(Vec<Option<NaiveTime>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
    TimestampTz(Vec<Option<DateTime<Utc>>>),
    Json(Vec<Option<serde_json::Value>>),
    /// Heterogeneous values, one native kind per cell.
    Mixed(Vec<Value<'static>>),
}

macro_rules! collect_nullable {
    ($values:expr, $variant:ident, $pat:pat => $out:expr) => {{
        let mut out = Vec::with_capacity($values.len());
        for (row, value) in $values.into_iter().enumerate() {
            out.push(match value {
                Value::Null => None,
                $pat => Some($out),
                other => return Err(mismatch(row, stringify!($variant), &other)),
            });
        }
        ColumnData::$variant(out)
    }};
}

fn mismatch(row: usize, container: &str, value: &Value<'_>) -> (usize, String) {
    (
        row,
        format!("{} value does not fit a {} container", value.kind_name(), container),
    )
}

impl ColumnData {
    /// Create an empty container of the given kind.
    pub fn empty(kind: ContainerKind) -> Self {
        match kind {
            ContainerKind::Int16 => ColumnData::Int16(Vec::new()),
            ContainerKind::Int32 => ColumnData::Int32(Vec::new()),
            ContainerKind::Int64 => ColumnData::Int64(Vec::new()),
            ContainerKind::NullableInt64 => ColumnData::NullableInt64(Vec::new()),
            ContainerKind::Float64 => ColumnData::Float64(Vec::new()),
            ContainerKind::Decimal => ColumnData::Decimal(Vec::new()),
            ContainerKind::Boolean => ColumnData::Boolean(Vec::new()),
            ContainerKind::NullableBoolean => ColumnData::NullableBoolean(Vec::new()),
            ContainerKind::Utf8 => ColumnData::Utf8(Vec::new()),
            ContainerKind::Binary => ColumnData::Binary(Vec::new()),
            ContainerKind::Date => ColumnData::Date(Vec::new()),
            ContainerKind::Time => ColumnData::Time(Vec::new()),
            ContainerKind::TimeTz => ColumnData::TimeTz(Vec::new()),
            ContainerKind::Timestamp => ColumnData::Timestamp(Vec::new()),
            ContainerKind::TimestampTz => ColumnData::TimestampTz(Vec::new()),
            ContainerKind::Json => ColumnData::Json(Vec::new()),
            ContainerKind::Mixed => ColumnData::Mixed(Vec::new()),
        }
    }

    /// Materialize owned values into a container of the given kind.
    ///
    /// Fails with the offending row and a reason when a value does not fit,
    /// including integers that overflow a narrow container and NULLs in a
    /// non-nullable one.
    pub fn from_values(
        kind: ContainerKind,
        values: Vec<Value<'static>>,
    ) -> std::result::Result<Self, (usize, String)> {
        let data = match kind {
            ContainerKind::Int16 => ColumnData::Int16(collect_exact(values, "int16")?),
            ContainerKind::Int32 => ColumnData::Int32(collect_exact(values, "int32")?),
            ContainerKind::Int64 => ColumnData::Int64(collect_exact(values, "int64")?),
            ContainerKind::NullableInt64 => {
                let mut out = Vec::with_capacity(values.len());
                for (row, value) in values.into_iter().enumerate() {
                    if value.is_null() {
                        out.push(None);
                        continue;
                    }
                    match value.as_i64() {
                        Some(v) => out.push(Some(v)),
                        None => return Err(mismatch(row, "NullableInt64", &value)),
                    }
                }
                ColumnData::NullableInt64(out)
            }
            ContainerKind::Float64 => collect_nullable!(values, Float64, Value::F64(v) => v),
            ContainerKind::Decimal => collect_nullable!(values, Decimal, Value::Decimal(v) => v),
            ContainerKind::Boolean => {
                let mut out = Vec::with_capacity(values.len());
                for (row, value) in values.into_iter().enumerate() {
                    match value {
                        Value::Bool(v) => out.push(v),
                        other => return Err(mismatch(row, "Boolean", &other)),
                    }
                }
                ColumnData::Boolean(out)
            }
            ContainerKind::NullableBoolean => {
                collect_nullable!(values, NullableBoolean, Value::Bool(v) => v)
            }
            ContainerKind::Utf8 => collect_nullable!(values, Utf8, Value::Text(v) => v.into_owned()),
            ContainerKind::Binary => {
                collect_nullable!(values, Binary, Value::Bytes(v) => v.into_owned())
            }
            ContainerKind::Date => collect_nullable!(values, Date, Value::Date(v) => v),
            ContainerKind::Time => collect_nullable!(values, Time, Value::Time(v) => v),
            ContainerKind::TimeTz => collect_nullable!(values, TimeTz, Value::TimeTz(v) => v),
            ContainerKind::Timestamp => {
                collect_nullable!(values, Timestamp, Value::DateTime(v) => v)
            }
            ContainerKind::TimestampTz => {
                collect_nullable!(values, TimestampTz, Value::DateTimeTz(v) => v)
            }
            ContainerKind::Json => collect_nullable!(values, Json, Value::Json(v) => v.into_owned()),
            ContainerKind::Mixed => ColumnData::Mixed(values),
        };
        Ok(data)
    }

    /// The container kind.
    pub fn kind(&self) -> ContainerKind {
        match self {
            ColumnData::Int16(_) => ContainerKind::Int16,
            ColumnData::Int32(_) => ContainerKind::Int32,
            ColumnData::Int64(_) => ContainerKind::Int64,
            ColumnData::NullableInt64(_) => ContainerKind::NullableInt64,
            ColumnData::Float64(_) => ContainerKind::Float64,
            ColumnData::Decimal(_) => ContainerKind::Decimal,
            ColumnData::Boolean(_) => ContainerKind::Boolean,
            ColumnData::NullableBoolean(_) => ContainerKind::NullableBoolean,
            ColumnData::Utf8(_) => ContainerKind::Utf8,
            ColumnData::Binary(_) => ContainerKind::Binary,
            ColumnData::Date(_) => ContainerKind::Date,
            ColumnData::Time(_) => ContainerKind::Time,
            ColumnData::TimeTz(_) => ContainerKind::TimeTz,
            ColumnData::Timestamp(_) => ContainerKind::Timestamp,
            ColumnData::TimestampTz(_) => ContainerKind::TimestampTz,
            ColumnData::Json(_) => ContainerKind::Json,
            ColumnData::Mixed(_) => ContainerKind::Mixed,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::NullableInt64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Decimal(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::NullableBoolean(v) => v.len(),
            ColumnData::Utf8(v) => v.len(),
            ColumnData::Binary(v) => v.len(),
            ColumnData::Date(v) => v.len(),
            ColumnData::Time(v) => v.len(),
            ColumnData::TimeTz(v) => v.len(),
            ColumnData::Timestamp(v) => v.len(),
            ColumnData::TimestampTz(v) => v.len(),
            ColumnData::Json(v) => v.len(),
            ColumnData::Mixed(v) => v.len(),
        }
    }

    /// Check if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the value at `row`. Panics if `row` is out of bounds.
    pub fn value(&self, row: usize) -> Value<'_> {
        fn opt<'a, T>(v: &'a Option<T>, f: impl FnOnce(&'a T) -> Value<'a>) -> Value<'a> {
            v.as_ref().map_or(Value::Null, f)
        }

        match self {
            ColumnData::Int16(v) => Value::I16(v[row]),
            ColumnData::Int32(v) => Value::I32(v[row]),
            ColumnData::Int64(v) => Value::I64(v[row]),
            ColumnData::NullableInt64(v) => opt(&v[row], |x| Value::I64(*x)),
            ColumnData::Float64(v) => opt(&v[row], |x| Value::F64(*x)),
            ColumnData::Decimal(v) => opt(&v[row], |x| Value::Decimal(*x)),
            ColumnData::Boolean(v) => Value::Bool(v[row]),
            ColumnData::NullableBoolean(v) => opt(&v[row], |x| Value::Bool(*x)),
            ColumnData::Utf8(v) => opt(&v[row], |x| Value::Text(Cow::Borrowed(x.as_str()))),
            ColumnData::Binary(v) => opt(&v[row], |x| Value::Bytes(Cow::Borrowed(x.as_slice()))),
            ColumnData::Date(v) => opt(&v[row], |x| Value::Date(*x)),
            ColumnData::Time(v) => opt(&v[row], |x| Value::Time(*x)),
            ColumnData::TimeTz(v) => opt(&v[row], |x| Value::TimeTz(*x)),
            ColumnData::Timestamp(v) => opt(&v[row], |x| Value::DateTime(*x)),
            ColumnData::TimestampTz(v) => opt(&v[row], |x| Value::DateTimeTz(*x)),
            ColumnData::Json(v) => opt(&v[row], |x| Value::Json(Cow::Borrowed(x))),
            ColumnData::Mixed(v) => match &v[row] {
                Value::Text(s) => Value::Text(Cow::Borrowed(s.as_ref())),
                Value::Bytes(b) => Value::Bytes(Cow::Borrowed(b.as_ref())),
                Value::Json(j) => Value::Json(Cow::Borrowed(j.as_ref())),
                other => other.clone(),
            },
        }
    }

    /// Iterate over borrowed values.
    pub fn iter(&self) -> impl Iterator<Item = Value<'_>> + '_ {
        (0..self.len()).map(move |row| self.value(row))
    }

    /// Number of NULL cells.
    pub fn null_count(&self) -> usize {
        self.iter().filter(Value::is_null).count()
    }
}

fn collect_exact<T>(values: Vec<Value<'static>>, container: &str) -> std::result::Result<Vec<T>, (usize, String)>
where
    T: TryFrom<i64>,
{
    let mut out = Vec::with_capacity(values.len());
    for (row, value) in values.into_iter().enumerate() {
        let Some(wide) = value.as_i64() else {
            return Err(mismatch(row, container, &value));
        };
        let narrow = T::try_from(wide)
            .map_err(|_| (row, format!("{} is out of range for a {} container", wide, container)))?;
        out.push(narrow);
    }
    Ok(out)
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name, unique within its table.
    pub name: String,
    /// Column values.
    pub data: ColumnData,
}

impl Column {
    /// Create a column.
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// An ordered set of row-aligned, uniquely named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedTable {
    columns: Vec<Column>,
}

impl TypedTable {
    /// Create an empty table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from columns, checking names are unique and lengths agree.
    pub fn try_new(columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::new();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Append a column.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.columns.iter().any(|c| c.name == column.name) {
            return Err(RedshiftError::InvalidTable(format!(
                "duplicate column name '{}'",
                column.name
            )));
        }
        if let Some(first) = self.columns.first() {
            if first.data.len() != column.data.len() {
                return Err(RedshiftError::InvalidTable(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name,
                    column.data.len(),
                    first.data.len()
                )));
            }
        }
        self.columns.push(column);
        Ok(())
    }

    /// Number of rows (zero for a table without columns).
    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.data.len())
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// All columns in order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Borrow one row as values in column order.
    pub fn row(&self, row: usize) -> Vec<Value<'_>> {
        self.columns.iter().map(|c| c.data.value(row)).collect()
    }

    /// Export as `{"columns": [...], "types": [...], "data": [[...], ...]}`.
    pub fn to_json(&self) -> serde_json::Value {
        let columns: Vec<&str> = self.column_names();
        let types: Vec<String> = self.columns.iter().map(|c| c.data.kind().to_string()).collect();
        let data: Vec<serde_json::Value> = (0..self.num_rows())
            .map(|row| {
                serde_json::Value::Array(self.row(row).iter().map(Value::to_json).collect())
            })
            .collect();
        serde_json::json!({ "columns": columns, "types": types, "data": data })
    }

    /// Import from `{"columns": [...], "data": [[...], ...]}`.
    ///
    /// Column containers are inferred from the JSON values: all-integer columns
    /// become `Int64` (or `NullableInt64` with nulls), mixed integer/float
    /// columns `Float64`, boolean columns `Boolean`/`NullableBoolean`, string columns
    /// `Utf8`, array/object columns `Json`, and anything else `Mixed`.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let records: JsonRecords = serde_json::from_value(value.clone())?;
        let width = records.columns.len();
        let mut cells: Vec<Vec<Value<'static>>> = vec![Vec::with_capacity(records.data.len()); width];
        for (row, record) in records.data.iter().enumerate() {
            if record.len() != width {
                return Err(RedshiftError::InvalidTable(format!(
                    "row {} has {} values, expected {}",
                    row,
                    record.len(),
                    width
                )));
            }
            for (idx, cell) in record.iter().enumerate() {
                cells[idx].push(Value::from_json(cell));
            }
        }

        let mut table = Self::new();
        for (name, values) in records.columns.into_iter().zip(cells) {
            let kind = infer_json_kind(&values);
            let values = if kind == ContainerKind::Float64 {
                values
                    .into_iter()
                    .map(|v| match v {
                        Value::I64(i) => Value::F64(i as f64),
                        other => other,
                    })
                    .collect()
            } else {
                values
            };
            let data = ColumnData::from_values(kind, values)
                .map_err(|(row, reason)| RedshiftError::InvalidTable(format!("column '{}' row {}: {}", name, row, reason)))?;
            table.push_column(Column::new(name, data))?;
        }
        Ok(table)
    }
}

#[derive(Deserialize)]
struct JsonRecords {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<serde_json::Value>>,
}

fn infer_json_kind(values: &[Value<'static>]) -> ContainerKind {
    let has_null = values.iter().any(Value::is_null);
    let non_null = || values.iter().filter(|v| !v.is_null());

    if non_null().all(|v| matches!(v, Value::I64(_))) {
        // An all-NULL column lands here as well.
        if has_null {
            ContainerKind::NullableInt64
        } else {
            ContainerKind::Int64
        }
    } else if non_null().all(|v| matches!(v, Value::I64(_) | Value::F64(_))) {
        ContainerKind::Float64
    } else if non_null().all(|v| matches!(v, Value::Bool(_))) {
        if has_null {
            ContainerKind::NullableBoolean
        } else {
            ContainerKind::Boolean
        }
    } else if non_null().all(|v| matches!(v, Value::Text(_))) {
        ContainerKind::Utf8
    } else if non_null().all(|v| matches!(v, Value::Json(_))) {
        ContainerKind::Json
    } else {
        ContainerKind::Mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TypedTable {
        TypedTable::try_new(vec![
            Column::new("id", ColumnData::Int32(vec![1, 2])),
            Column::new(
                "name",
                ColumnData::Utf8(vec![Some("a".to_string()), None]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_table_shape() {
        let table = sample();
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.column_names(), vec!["id", "name"]);
        assert_eq!(table.row(1), vec![Value::I32(2), Value::Null]);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut table = sample();
        let err = table
            .push_column(Column::new("id", ColumnData::Int32(vec![3, 4])))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate column name 'id'"));
    }

    #[test]
    fn test_ragged_column_rejected() {
        let mut table = sample();
        let err = table
            .push_column(Column::new("x", ColumnData::Int32(vec![3])))
            .unwrap_err();
        assert!(matches!(err, RedshiftError::InvalidTable(_)));
    }

    #[test]
    fn test_from_values_narrows_and_checks_range() {
        let data = ColumnData::from_values(ContainerKind::Int16, vec![Value::I64(7)]).unwrap();
        assert_eq!(data, ColumnData::Int16(vec![7]));

        let err = ColumnData::from_values(ContainerKind::Int16, vec![Value::I64(40_000)]).unwrap_err();
        assert_eq!(err.0, 0);
        assert!(err.1.contains("out of range"));
    }

    #[test]
    fn test_from_values_rejects_null_in_plain_container() {
        let err =
            ColumnData::from_values(ContainerKind::Int32, vec![Value::I64(1), Value::Null]).unwrap_err();
        assert_eq!(err.0, 1);
    }

    #[test]
    fn test_null_count() {
        let data = ColumnData::Float64(vec![Some(1.0), None, Some(f64::NAN)]);
        assert_eq!(data.null_count(), 2);
    }

    #[test]
    fn test_json_round_trip_shape() {
        let json = serde_json::json!({
            "columns": ["id", "flag", "payload"],
            "data": [[1, true, {"a": 1}], [null, false, [1, 2]]]
        });
        let table = TypedTable::from_json(&json).unwrap();
        assert_eq!(table.column("id").unwrap().data.kind(), ContainerKind::NullableInt64);
        assert_eq!(table.column("flag").unwrap().data.kind(), ContainerKind::Boolean);
        assert_eq!(table.column("payload").unwrap().data.kind(), ContainerKind::Json);

        let exported = table.to_json();
        assert_eq!(exported["data"][0][0], serde_json::json!(1));
        assert_eq!(exported["types"][0], serde_json::json!("nullable_int64"));
    }

    #[test]
    fn test_empty_table_keeps_columns() {
        let json = serde_json::json!({ "columns": ["id", "name"], "data": [] });
        let table = TypedTable::from_json(&json).unwrap();
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.num_rows(), 0);
    }
}
