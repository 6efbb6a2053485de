//! Report renderers for grouped package changes.
//!
//! - [`terminal`] — colored summary and one table per group; respects `--verbose` / `--quiet`.
//! - [`text`] — plain blocks separated by a divider, one block per group.
//! - [`table`] — a single content-sized grid, one row per group.
//! - [`xlsx`] — spreadsheet with one row block per group.

use anyhow::Result;
use chrono::{Local, TimeZone};
use serde::Serialize;

use crate::engine::pipeline::Report;
use crate::models::{ChangeGroup, GroupBy};

pub mod table;
pub mod terminal;
pub mod text;
pub mod xlsx;

/// Column layout shared by the tabular renderers.
pub(crate) fn column_headers(group_by: GroupBy) -> &'static [&'static str] {
    match group_by {
        GroupBy::Diff => &["Hosts", "Removed", "Installed"],
        GroupBy::Inventory => &["Hosts", "Inventory"],
    }
}

/// Cell contents of one group, matching [`column_headers`].
pub(crate) fn group_cells(group: &ChangeGroup, group_by: GroupBy) -> Vec<Vec<String>> {
    let hosts = group.members.iter().map(|m| m.host_name.clone()).collect();
    match group_by {
        GroupBy::Diff => vec![
            hosts,
            group.changes.removed.clone(),
            group.changes.installed.clone(),
        ],
        GroupBy::Inventory => vec![hosts, group.signature.clone()],
    }
}

pub(crate) fn format_time(timestamp: i64) -> String {
    match Local.timestamp_opt(timestamp, 0).single() {
        Some(dt) => dt.format("%d.%m.%Y %H:%M").to_string(),
        None => timestamp.to_string(),
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a Report,
    groups: Vec<&'a ChangeGroup>,
}

/// Serialize the report with its groups as an ordered array.
pub fn to_json(report: &Report) -> Result<String> {
    let json = JsonReport {
        report,
        groups: report.groups.values().collect(),
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

pub(crate) fn member_count(report: &Report) -> usize {
    report.groups.values().map(|g| g.members.len()).sum()
}


#[cfg(test)]
pub(crate) mod fixtures {
    use indexmap::IndexMap;

    use crate::engine::pipeline::Report;
    use crate::models::{ChangeGroup, ChangeSet, GroupBy, HostRecord, Window, WindowingKind};

    fn host(name: &str) -> HostRecord {
        HostRecord {
            host_id: format!("id-{name}"),
            host_name: name.to_string(),
            item_id: Some(format!("item-{name}")),
            sample_timestamp: Some(1_653_585_600),
            old_packages: Default::default(),
            new_packages: Default::default(),
        }
    }

    /// Two groups: a shared upgrade on two hosts, and one host without data.
    pub fn diff_report() -> Report {
        let mut groups = IndexMap::new();
        let upgrade = ChangeSet {
            installed: vec!["curl=7.81.0-1ubuntu1.4".to_string()],
            removed: vec!["curl=7.81.0-1ubuntu1.3".to_string()],
        };
        groups.insert(
            vec![
                "curl=7.81.0-1ubuntu1.4".to_string(),
                "curl=7.81.0-1ubuntu1.3".to_string(),
            ],
            ChangeGroup {
                signature: vec![
                    "curl=7.81.0-1ubuntu1.4".to_string(),
                    "curl=7.81.0-1ubuntu1.3".to_string(),
                ],
                changes: upgrade,
                members: vec![host("web-1"), host("web-2")],
            },
        );
        let no_data = ChangeSet::no_data();
        let signature: Vec<String> = no_data
            .installed
            .iter()
            .chain(&no_data.removed)
            .cloned()
            .collect();
        groups.insert(
            signature.clone(),
            ChangeGroup {
                signature,
                changes: no_data,
                members: vec![HostRecord::missing("id-db-1", "db-1")],
            },
        );

        Report {
            group_by: GroupBy::Diff,
            windowing: WindowingKind::EventDriven,
            event_window: Window::new(1_653_545_000, 1_653_585_000),
            history_window: Window::new(1_653_538_000, 1_653_585_000),
            hosts_seen: 3,
            hosts_unchanged: 0,
            hosts_without_data: 1,
            groups,
        }
    }

    pub fn inventory_report() -> Report {
        let mut groups = IndexMap::new();
        let signature = vec!["bash=5.1".to_string(), "curl=7.81".to_string()];
        groups.insert(
            signature.clone(),
            ChangeGroup {
                signature,
                changes: ChangeSet::default(),
                members: vec![host("web-1")],
            },
        );

        Report {
            group_by: GroupBy::Inventory,
            windowing: WindowingKind::Range,
            event_window: Window::new(0, 10),
            history_window: Window::new(0, 10),
            hosts_seen: 1,
            hosts_unchanged: 0,
            hosts_without_data: 0,
            groups,
        }
    }
}
