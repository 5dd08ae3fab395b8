//! Reporting utilities: row selection and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::CategoryBreakdown;

/// Rows to display for a breakdown.
///
/// All-zero categories are hidden unless `show_zero` is set; the underlying
/// breakdown always keeps its four rows.
pub fn display_breakdown(rows: &[CategoryBreakdown], show_zero: bool) -> Vec<&CategoryBreakdown> {
    rows.iter().filter(|r| show_zero || !r.is_empty()).collect()
}
