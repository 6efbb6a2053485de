use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::engine::pipeline::Report;
use crate::models::GroupBy;

/// Line printed after every group block.
pub const DIVIDER: &str = "------------------------------------------";

/// Write the text report to `path`.
pub fn render(report: &Report, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = std::io::BufWriter::new(file);
    write_report(report, &mut out)?;
    out.flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Text report written to: {}", path.display());
    Ok(())
}

/// One block per group: member hosts, then the group's packages.
pub fn write_report<W: Write>(report: &Report, out: &mut W) -> Result<()> {
    for group in report.groups.values() {
        for member in &group.members {
            writeln!(out, "{}", member.host_name)?;
        }

        match report.group_by {
            GroupBy::Diff => {
                write_section(out, "New packages:", &group.changes.installed)?;
                write_section(out, "Removed packages:", &group.changes.removed)?;
            }
            GroupBy::Inventory => write_section(out, "Packages:", &group.signature)?,
        }

        writeln!(out, "{DIVIDER}")?;
    }
    Ok(())
}

fn write_section<W: Write>(out: &mut W, title: &str, packages: &[String]) -> Result<()> {
    if packages.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n{title}")?;
    for package in packages {
        writeln!(out, "{package}")?;
    }
    Ok(())
}
