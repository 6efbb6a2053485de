use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};

use super::{column_headers, group_cells};
use crate::engine::pipeline::Report;

/// Extra characters added to the longest value of each column.
const WIDTH_PADDING: usize = 5;

/// One populated worksheet cell, zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetCell {
    pub row: u32,
    pub col: u16,
    pub value: String,
    pub header: bool,
}

/// Lay out each group as a block: a header row, then one line per host or
/// package in each column, then a blank row before the next block.
pub fn layout(report: &Report) -> Vec<SheetCell> {
    let headers = column_headers(report.group_by);
    let mut cells = Vec::new();
    let mut top: u32 = 0;

    for group in report.groups.values() {
        for (col, header) in (0u16..).zip(headers.iter()) {
            cells.push(SheetCell {
                row: top,
                col,
                value: header.to_string(),
                header: true,
            });
        }

        let columns = group_cells(group, report.group_by);
        let height = columns.iter().map(Vec::len).max().unwrap_or(0);
        for (col, lines) in (0u16..).zip(columns) {
            for (row, value) in (top + 1..).zip(lines) {
                cells.push(SheetCell {
                    row,
                    col,
                    value,
                    header: false,
                });
            }
        }

        top += height as u32 + 2;
    }

    cells
}

/// Width per column: longest non-empty value plus padding.
pub fn column_widths(cells: &[SheetCell]) -> Vec<usize> {
    let mut widths: Vec<usize> = Vec::new();
    for cell in cells.iter().filter(|c| !c.value.is_empty()) {
        let col = usize::from(cell.col);
        if widths.len() <= col {
            widths.resize(col + 1, 0);
        }
        widths[col] = widths[col].max(cell.value.chars().count());
    }
    widths
        .into_iter()
        .map(|w| if w == 0 { 0 } else { w + WIDTH_PADDING })
        .collect()
}

/// Write the spreadsheet to `path`.
pub fn render(report: &Report, path: &Path) -> Result<()> {
    let cells = layout(report);
    let bold = Format::new().set_bold();

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Changes")?;

    for cell in &cells {
        if cell.header {
            worksheet.write_string_with_format(cell.row, cell.col, &cell.value, &bold)?;
        } else {
            worksheet.write_string(cell.row, cell.col, &cell.value)?;
        }
    }
    for (col, width) in (0u16..).zip(column_widths(&cells)) {
        if width > 0 {
            worksheet.set_column_width(col, width as f64)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write spreadsheet to {}", path.display()))?;

    println!("Spreadsheet report written to: {}", path.display());
    Ok(())
}
