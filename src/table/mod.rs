//! Table reconstruction: detected cells → dense grid → rendered text.
//!
//! ```text
//! RawCell ──▶ Cell ──▶ Grid ──▶ normalize ──▶ header/data ──▶ Markdown | HTML
//!  (cell)     (cell)   (grid)   (normalize)                   (render)
//! ```

pub mod cell;
pub mod grid;
pub mod normalize;
pub mod render;

pub use cell::{parse_cells, Cell, RawCell};
pub use grid::Grid;
pub use normalize::normalize;
pub use render::render_table;

use crate::config::TableFormat;
use crate::error::TableError;

/// Run the full reconstruction for one detected table.
///
/// The first grid row becomes the header; every position, header labels
/// included, is normalised before rendering.
///
/// # Errors
/// [`TableError::MalformedCell`] for an invalid record,
/// [`TableError::EmptyTable`] when there are no cells.
pub fn reconstruct(raw: &[RawCell], format: TableFormat) -> Result<String, TableError> {
    let cells = parse_cells(raw)?;
    render_cells(&cells, format)
}

/// Like [`reconstruct`] for cells that are already validated.
pub fn render_cells(cells: &[Cell], format: TableFormat) -> Result<String, TableError> {
    let grid = Grid::expand(cells)?.map_cells(normalize);
    let (header, data) = grid.split_header().ok_or(TableError::EmptyTable)?;
    Ok(render_table(header, data, format))
}
