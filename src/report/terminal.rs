use anyhow::Result;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use super::{column_headers, format_time, group_cells, member_count};
use crate::engine::pipeline::Report;
use crate::models::{ChangeGroup, GroupBy, NO_DATA};

/// Render a colored terminal report.
pub fn render(report: &Report, verbose: bool, quiet: bool) -> Result<()> {
    let groups = report.groups.len();
    let reported = member_count(report);

    if quiet {
        println!(
            "Hosts: {}  Groups: {}  Reported: {}  No data: {}",
            report.hosts_seen,
            groups.to_string().cyan(),
            reported.to_string().green(),
            report.hosts_without_data.to_string().red(),
        );
        return Ok(());
    }

    println!(
        "\n {} v{}",
        "inventory-diff".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!(
        " Events:  {} → {}",
        format_time(report.event_window.from),
        format_time(report.event_window.till)
    );
    println!(
        " History: {} → {}\n",
        format_time(report.history_window.from),
        format_time(report.history_window.till)
    );

    println!(" ┌────────────────────────────────────────────────────┐");
    println!(" │  {:<48} │", "SUMMARY".bold());
    for line in summary_lines(report) {
        println!(" │  {:<48} │", line);
    }
    println!(" └────────────────────────────────────────────────────┘\n");

    if groups == 0 {
        println!(" {} No package changes to report.\n", "[OK]".green().bold());
        return Ok(());
    }

    for (index, group) in report.groups.values().enumerate() {
        let label = if group.changes.is_no_data() {
            "[NO DATA]".red().bold()
        } else {
            format!("[GROUP {}]", index + 1).cyan().bold()
        };
        println!(" {} {} host(s):\n", label, group.members.len());
        render_table(report, group, verbose);
        println!();
    }

    Ok(())
}

fn summary_lines(report: &Report) -> Vec<String> {
    vec![
        format!("Hosts with change events : {}", report.hosts_seen),
        format!("Grouped by               : {}", report.group_by),
        format!("Windowing                : {}", report.windowing),
        format!("Groups                   : {}", report.groups.len()),
        format!("Hosts reported           : {}", member_count(report)),
        format!("Hosts without changes    : {}", report.hosts_unchanged),
        format!("Hosts without data       : {}", report.hosts_without_data),
    ]
}

fn render_table(report: &Report, group: &ChangeGroup, verbose: bool) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            column_headers(report.group_by)
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );

    let mut columns = group_cells(group, report.group_by);
    if verbose {
        columns[0] = group
            .members
            .iter()
            .map(|m| match &m.item_id {
                Some(item) => format!("{} (item {})", m.host_name, item),
                None => m.host_name.clone(),
            })
            .collect();
    }

    let colors: &[Color] = match report.group_by {
        GroupBy::Diff => &[Color::Reset, Color::Red, Color::Green],
        GroupBy::Inventory => &[Color::Reset, Color::Reset],
    };
    let row: Vec<Cell> = columns
        .into_iter()
        .zip(colors.iter().copied())
        .map(|(lines, color)| {
            let color = if lines.iter().any(|l| l == NO_DATA) {
                Color::DarkGrey
            } else {
                color
            };
            Cell::new(lines.join("\n")).fg(color)
        })
        .collect();
    table.add_row(row);

    println!("{}", table);
}
