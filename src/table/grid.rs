//! Grid expansion: turn sparse, spanning cells into a dense row-major matrix.
//!
//! The grid is sized by the largest anchor row and column only. Span extents
//! are not taken into account, so a span that reaches past the last anchored
//! row or column is clipped at the grid edge rather than growing the grid.

use crate::error::TableError;
use crate::table::cell::Cell;

/// Largest number of positions a single grid may hold.
pub const MAX_GRID_CELLS: usize = 1_000_000;

/// Dense 2-D text matrix, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    /// Expand `cells` into a grid of `max(row) × max(col)` positions.
    ///
    /// Every covered position receives the cell's text. Cells are applied in
    /// input order, so a later cell overwrites an earlier one where their
    /// footprints overlap. Positions outside the grid are skipped.
    ///
    /// # Errors
    /// [`TableError::EmptyTable`] when `cells` is empty, and
    /// [`TableError::MalformedCell`] naming the widest or tallest anchor when
    /// the grid would exceed [`MAX_GRID_CELLS`] positions.
    pub fn expand(cells: &[Cell]) -> Result<Self, TableError> {
        let (row_at, max_row) = widest(cells, |c| c.row).ok_or(TableError::EmptyTable)?;
        let (col_at, max_col) = widest(cells, |c| c.col).ok_or(TableError::EmptyTable)?;

        if max_row.checked_mul(max_col).map_or(true, |area| area > MAX_GRID_CELLS) {
            let (index, field) = if max_row >= max_col { (row_at, "row") } else { (col_at, "col") };
            return Err(TableError::malformed(
                index,
                field,
                format!("makes a {max_row}×{max_col} grid, over {MAX_GRID_CELLS} positions"),
            ));
        }
        Ok(Self::expand_within(cells, max_row, max_col))
    }

    fn expand_within(cells: &[Cell], max_row: usize, max_col: usize) -> Self {
        let mut rows = vec![vec![String::new(); max_col]; max_row];

        for cell in cells {
            let (Some(row_start), Some(col_start)) = (cell.row.checked_sub(1), cell.col.checked_sub(1))
            else {
                continue;
            };
            for row in rows
                .iter_mut()
                .skip(row_start)
                .take(cell.rowspan)
            {
                for slot in row.iter_mut().skip(col_start).take(cell.colspan) {
                    slot.clone_from(&cell.text);
                }
            }
        }

        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// Apply `f` to every position, e.g. text normalisation.
    pub fn map_cells(self, f: impl Fn(&str) -> String) -> Self {
        let rows = self
            .rows
            .into_iter()
            .map(|r| r.iter().map(|s| f(s)).collect())
            .collect();
        Self { rows }
    }

    /// Split into the header row (row 0) and the data rows (rows 1..).
    ///
    /// Returns `None` for a grid with no rows.
    pub fn split_header(&self) -> Option<(&[String], &[Vec<String>])> {
        let (header, data) = self.rows.split_first()?;
        Some((header.as_slice(), data))
    }
}

/// Position and value of the largest `key` among `cells`.
fn widest(cells: &[Cell], key: impl Fn(&Cell) -> usize) -> Option<(usize, usize)> {
    cells
        .iter()
        .enumerate()
        .map(|(i, c)| (i, key(c)))
        .max_by_key(|&(_, v)| v)
}
