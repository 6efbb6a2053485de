use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::presets::ASCII_FULL;
use comfy_table::{ContentArrangement, Table};

use super::{column_headers, group_cells};
use crate::engine::pipeline::Report;

/// Build the grid: one row per group, multi-line cells, widths sized to content.
pub fn build_table(report: &Report) -> Table {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Disabled)
        .set_header(column_headers(report.group_by).to_vec());

    for group in report.groups.values() {
        let row: Vec<String> = group_cells(group, report.group_by)
            .into_iter()
            .map(|lines| lines.join("\n"))
            .collect();
        table.add_row(row);
    }

    table
}

/// Write the grid to `path`.
pub fn render(report: &Report, path: &Path) -> Result<()> {
    let table = build_table(report);
    std::fs::write(path, format!("{table}\n"))
        .with_context(|| format!("Failed to write table to {}", path.display()))?;

    println!("Table report written to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures;

    #[test]
    fn test_diff_table_layout() {
        let rendered = build_table(&fixtures::diff_report()).to_string();
        let lines: Vec<&str> = rendered.lines().collect();

        assert!(lines[1].contains("Hosts"));
        assert!(lines[1].contains("Removed"));
        assert!(lines[1].contains("Installed"));

        let web1 = lines.iter().position(|l| l.contains("web-1")).unwrap();
        assert!(lines[web1].contains("curl=7.81.0-1ubuntu1.3"));
        assert!(lines[web1].contains("curl=7.81.0-1ubuntu1.4"));
        assert!(lines[web1 + 1].contains("web-2"));
        assert!(rendered.contains("No Data"));

        // Every line has the same width when cells are sized to content.
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
    }

    #[test]
    fn test_inventory_table_columns() {
        let rendered = build_table(&fixtures::inventory_report()).to_string();
        assert!(rendered.contains("Inventory"));
        assert!(!rendered.contains("Installed"));
        assert!(rendered.contains("bash=5.1"));
    }

    #[test]
    fn test_render_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output-table.txt");
        render(&fixtures::inventory_report(), &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("web-1"));
    }
}
