//! Cell-by-cell comparison of spreadsheet workbooks.
//!
//! Every sheet is loaded as a positional grid of displayed values, with
//! empty cells as empty strings. Two workbooks are compared only when they
//! have the same number of sheets; each sheet name present in both is
//! scored and the workbook score is the mean of those sheet scores.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};

use super::extract::DocumentError;

/// One sheet as a rectangular grid of displayed cell values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetGrid {
    /// Top-left cell of the used range, `None` for an empty sheet
    pub origin: Option<(u32, u32)>,
    /// Rows of displayed values; every row has the same width
    pub rows: Vec<Vec<String>>,
}

impl SheetGrid {
    /// Grid from rows of displayed values, anchored at A1.
    #[must_use]
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        let origin = if rows.is_empty() { None } else { Some((0, 0)) };
        Self { origin, rows }
    }

    /// `(rows, columns)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.rows.first().map_or(0, Vec::len))
    }

    fn from_range(range: &Range<Data>) -> Self {
        let rows = range
            .rows()
            .map(|row| row.iter().map(display_cell).collect())
            .collect();
        Self {
            origin: range.start(),
            rows,
        }
    }
}

fn display_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// A workbook as named grids, in workbook order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    /// `(sheet name, grid)` pairs
    pub sheets: Vec<(String, SheetGrid)>,
}

impl Workbook {
    /// Load every sheet of the workbook at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Spreadsheet`] if the workbook or one of its
    /// sheets cannot be read.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let to_error = |e: calamine::Error| DocumentError::Spreadsheet {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let mut workbook = open_workbook_auto(path).map_err(to_error)?;
        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&name).map_err(to_error)?;
            sheets.push((name, SheetGrid::from_range(&range)));
        }

        log::trace!("Loaded {} sheet(s) from {}", sheets.len(), path.display());
        Ok(Self { sheets })
    }

    fn sheet(&self, name: &str) -> Option<&SheetGrid> {
        self.sheets.iter().find(|(n, _)| n == name).map(|(_, g)| g)
    }
}

/// Score one pair of sheets.
///
/// 0.0 when the grids differ in shape or position; otherwise the fraction
/// of positions holding the same displayed value. Two empty sheets are
/// identical.
#[must_use]
pub fn sheet_score(a: &SheetGrid, b: &SheetGrid) -> f64 {
    if a.shape() != b.shape() || a.origin != b.origin {
        return 0.0;
    }

    let (rows, cols) = a.shape();
    let total = rows * cols;
    if total == 0 {
        return 1.0;
    }

    let matching = a
        .rows
        .iter()
        .zip(&b.rows)
        .flat_map(|(ra, rb)| ra.iter().zip(rb))
        .filter(|(ca, cb)| ca == cb)
        .count();

    matching as f64 / total as f64
}

/// Score two workbooks.
///
/// 0.0 when the sheet counts differ or no sheet name is shared.
#[must_use]
pub fn workbook_score(a: &Workbook, b: &Workbook) -> f64 {
    if a.sheets.len() != b.sheets.len() {
        return 0.0;
    }

    let scores: Vec<f64> = a
        .sheets
        .iter()
        .filter_map(|(name, grid)| b.sheet(name).map(|other| sheet_score(grid, other)))
        .collect();

    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Load and score two workbook files.
///
/// # Errors
///
/// Returns the first [`DocumentError`] hit while loading either file.
pub fn compare_workbooks(a: &Path, b: &Path) -> Result<f64, DocumentError> {
    let left = Workbook::load(a)?;
    let right = Workbook::load(b)?;
    Ok(workbook_score(&left, &right))
}
