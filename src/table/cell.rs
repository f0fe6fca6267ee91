//! Cell model: validate raw cell records from the table-detection service.
//!
//! Records are read field by field from a structured object. Geometry must be
//! present and numeric; text is kept verbatim so the raw value survives for
//! debugging and is only normalised when the grid is rendered.

use crate::error::TableError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One cell record as returned by the detection service, before validation.
///
/// Every field is optional at this stage so that a missing field surfaces as
/// a [`TableError::MalformedCell`] naming it rather than as an opaque decode
/// failure for the whole response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCell {
    #[serde(default, alias = "row_index")]
    pub row: Option<Value>,
    #[serde(default, alias = "column", alias = "column_index")]
    pub col: Option<Value>,
    #[serde(default, alias = "row_span")]
    pub rowspan: Option<Value>,
    #[serde(default, alias = "column_span", alias = "col_span")]
    pub colspan: Option<Value>,
    #[serde(default, alias = "is_column_header")]
    pub is_header: Option<Value>,
    #[serde(default, alias = "is_merged_cell")]
    pub is_merged: Option<Value>,
    #[serde(default)]
    pub text: Option<Value>,
}

/// A validated table cell.
///
/// `row` and `col` are 1-based anchors; the cell covers
/// `[row-1, row-1+rowspan) × [col-1, col-1+colspan)` in 0-based grid space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub rowspan: usize,
    pub colspan: usize,
    pub is_header: bool,
    pub is_merged: bool,
    pub text: String,
}

impl Cell {
    /// Convenience constructor for a plain (non-header, non-merged) cell.
    pub fn new(row: usize, col: usize, rowspan: usize, colspan: usize, text: impl Into<String>) -> Self {
        Self {
            row,
            col,
            rowspan,
            colspan,
            is_header: false,
            is_merged: false,
            text: text.into(),
        }
    }

    /// Validate a raw record. `index` is the record's position in its table
    /// and is only used for error reporting.
    pub fn from_raw(index: usize, raw: &RawCell) -> Result<Self, TableError> {
        Ok(Self {
            row: positive(index, "row", raw.row.as_ref())?,
            col: positive(index, "col", raw.col.as_ref())?,
            rowspan: positive(index, "rowspan", raw.rowspan.as_ref())?,
            colspan: positive(index, "colspan", raw.colspan.as_ref())?,
            is_header: flag(index, "is_header", raw.is_header.as_ref())?,
            is_merged: flag(index, "is_merged", raw.is_merged.as_ref())?,
            text: text(index, raw.text.as_ref())?,
        })
    }
}

/// Largest accepted row, column or span value.
pub const MAX_CELL_INDEX: usize = 10_000;

/// Validate every record of one detected table, failing on the first bad one.
pub fn parse_cells(raw: &[RawCell]) -> Result<Vec<Cell>, TableError> {
    raw.iter()
        .enumerate()
        .map(|(i, r)| Cell::from_raw(i, r))
        .collect()
}

fn positive(index: usize, field: &str, value: Option<&Value>) -> Result<usize, TableError> {
    let n = match value {
        None | Some(Value::Null) => return Err(TableError::malformed(index, field, "is missing")),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| TableError::malformed(index, field, format!("is not a whole number: {n}")))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| TableError::malformed(index, field, format!("is not numeric: {s:?}")))?,
        Some(other) => {
            return Err(TableError::malformed(
                index,
                field,
                format!("is not numeric: {other}"),
            ))
        }
    };
    if n == 0 {
        return Err(TableError::malformed(index, field, "must be ≥ 1"));
    }
    match usize::try_from(n) {
        Ok(n) if n <= MAX_CELL_INDEX => Ok(n),
        _ => Err(TableError::malformed(
            index,
            field,
            format!("exceeds {MAX_CELL_INDEX}: {n}"),
        )),
    }
}

fn flag(index: usize, field: &str, value: Option<&Value>) -> Result<bool, TableError> {
    match value {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(true),
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(false),
        Some(other) => Err(TableError::malformed(
            index,
            field,
            format!("is not a boolean: {other}"),
        )),
    }
}

fn text(index: usize, value: Option<&Value>) -> Result<String, TableError> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(TableError::malformed(
            index,
            "text",
            format!("is not a string: {other}"),
        )),
    }
}
