//! 行形状归一化
//!
//! Drivers do not always return rows shaped like the column list: a
//! single-column result may come back as bare scalars, and a row may carry
//! more or fewer values than there are columns. All of that is absorbed here
//! so nothing downstream has to care which client produced the rows.

use common::models::{CellValue, DriverRow};

/// Reconciles a driver row to exactly `width` cells.
///
/// - a scalar becomes a one-cell row (then padded if `width > 1`);
/// - extra values are dropped, missing ones become nulls;
/// - a row of the right width is returned unchanged.
pub fn normalize_row(row: DriverRow, width: usize) -> Vec<CellValue> {
    let mut cells = match row {
        DriverRow::Scalar(value) => vec![value],
        DriverRow::Tuple(values) => values,
    };
    cells.resize(width, CellValue::Null);
    cells
}

/// Reconciles every row of a result.
pub fn normalize_rows(rows: Vec<DriverRow>, width: usize) -> Vec<Vec<CellValue>> {
    rows.into_iter().map(|row| normalize_row(row, width)).collect()
}
