use std::collections::HashSet;

use anyhow::Result;
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::diff::diff;
use super::grouper::group;
use super::pairer::{pair, PairingStrategy};
use super::MonitoringSource;
use crate::models::{
    ChangeEvent, ChangeGroup, ChangeSet, FormatTag, GroupBy, HostOrder, HostRecord,
    InventoryItem, MissingHostPolicy, Signature, UnchangedPolicy, Window, WindowingKind,
};

const HOUR: i64 = 3600;

/// How event and history windows are derived from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Windowing {
    /// Events from the last `search_hours`; history covers `trigger_hours + 1`
    /// hours up to the newest event, two samples per item.
    EventDriven { search_hours: u32, trigger_hours: u32 },
    /// Events and history from the last `hours`.
    Fixed { hours: u32 },
    /// Events and history within an explicit window.
    Range { window: Window },
}

impl Windowing {
    pub fn kind(&self) -> WindowingKind {
        match self {
            Windowing::EventDriven { .. } => WindowingKind::EventDriven,
            Windowing::Fixed { .. } => WindowingKind::Fixed,
            Windowing::Range { .. } => WindowingKind::Range,
        }
    }
}

/// Everything that varies between report flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub group_by: GroupBy,
    pub windowing: Windowing,
    pub missing_hosts: MissingHostPolicy,
    pub unchanged_hosts: UnchangedPolicy,
    pub order: HostOrder,
}

/// Grouped result of one run, consumed by the report renderers.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub group_by: GroupBy,
    pub windowing: WindowingKind,
    pub event_window: Window,
    pub history_window: Window,
    pub hosts_seen: usize,
    pub hosts_unchanged: usize,
    pub hosts_without_data: usize,
    #[serde(skip)]
    pub groups: IndexMap<Signature, ChangeGroup>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// No package change events in the window; nothing to report.
    NoEvents { window: Window },
    Report(Report),
}

/// Run one batch: events → items → history → pairs → diffs → groups.
///
/// `now` is the report time in unix seconds.
pub async fn run<S: MonitoringSource>(
    source: &S,
    settings: &EngineSettings,
    now: i64,
) -> Result<RunOutcome> {
    let event_window = match settings.windowing {
        Windowing::EventDriven { search_hours, .. } => {
            Window::new(now - i64::from(search_hours) * HOUR, now)
        }
        Windowing::Fixed { hours } => Window::new(now - i64::from(hours) * HOUR, now),
        Windowing::Range { window } => window,
    };

    info!(from = event_window.from, till = event_window.till, "querying change events");
    let events = source.change_events(event_window).await?;
    if events.is_empty() {
        info!("no package change events found");
        return Ok(RunOutcome::NoEvents {
            window: event_window,
        });
    }

    let hosts = unique_hosts(&events);
    let host_ids: Vec<String> = hosts.iter().map(|h| h.host_id.clone()).collect();
    info!(events = events.len(), hosts = hosts.len(), "resolving inventory items");

    let items = preferred_items(source.inventory_items(&host_ids).await?);
    debug!(items = items.len(), "selected inventory items");

    let (history_window, strategy, limit) = match settings.windowing {
        Windowing::EventDriven { trigger_hours, .. } => {
            let anchor = events.iter().map(|e| e.timestamp).max().unwrap_or(now);
            let window = Window::new(anchor - (i64::from(trigger_hours) + 1) * HOUR, anchor);
            (window, PairingStrategy::FixedCount, Some(items.len() * 2))
        }
        Windowing::Fixed { .. } | Windowing::Range { .. } => {
            (event_window, PairingStrategy::Range, None)
        }
    };

    let samples = if items.is_empty() {
        Vec::new()
    } else {
        source.history(&items, history_window, limit).await?
    };
    info!(samples = samples.len(), ?strategy, "pairing inventory history");

    // Fixed-count history is already limited upstream; range pairing filters again.
    let filter = match strategy {
        PairingStrategy::FixedCount => None,
        PairingStrategy::Range => Some(history_window),
    };
    let records = pair(&items, &samples, filter, strategy)?;

    let paired: HashSet<String> = records.iter().map(|r| r.host_id.clone()).collect();
    let mut entries: Vec<(HostRecord, ChangeSet)> = records
        .into_iter()
        .map(|record| {
            let changes = diff(&record.old_packages, &record.new_packages);
            debug!(
                host = %record.host_name,
                old = record.old_packages.len(),
                new = record.new_packages.len(),
                installed = changes.installed.len(),
                removed = changes.removed.len(),
                "computed diff"
            );
            (record, changes)
        })
        .collect();
    let hosts_unchanged = entries.iter().filter(|(_, c)| c.is_empty()).count();

    let mut hosts_without_data = 0;
    for host in hosts.iter().filter(|h| !paired.contains(&h.host_id)) {
        hosts_without_data += 1;
        match settings.missing_hosts {
            MissingHostPolicy::Sentinel => {
                warn!(host = %host.host_name, "no inventory history, reporting as no data");
                entries.push((
                    HostRecord::missing(host.host_id.clone(), host.host_name.clone()),
                    ChangeSet::no_data(),
                ));
            }
            MissingHostPolicy::Drop => {
                warn!(host = %host.host_name, "no inventory history, dropping host");
            }
        }
    }

    order_entries(&mut entries, settings.order);
    let groups = group(entries, settings.group_by, settings.unchanged_hosts);
    info!(groups = groups.len(), "grouped hosts");

    Ok(RunOutcome::Report(Report {
        group_by: settings.group_by,
        windowing: settings.windowing.kind(),
        event_window,
        history_window,
        hosts_seen: hosts.len(),
        hosts_unchanged,
        hosts_without_data,
        groups,
    }))
}

/// One event per host, keeping the first (newest) one.
fn unique_hosts(events: &[ChangeEvent]) -> Vec<&ChangeEvent> {
    let mut seen: IndexMap<&str, &ChangeEvent> = IndexMap::new();
    for event in events {
        seen.entry(event.host_id.as_str()).or_insert(event);
    }
    seen.into_values().collect()
}

/// Keep one item per host: newline-formatted items win, then the lowest item id.
fn preferred_items(items: Vec<InventoryItem>) -> Vec<InventoryItem> {
    let mut chosen: IndexMap<String, InventoryItem> = IndexMap::new();
    for item in items {
        match chosen.entry(item.host_id.clone()) {
            Entry::Occupied(mut slot) => {
                if preference(&item) < preference(slot.get()) {
                    slot.insert(item);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
        }
    }
    chosen.into_values().collect()
}

fn preference(item: &InventoryItem) -> (bool, usize, &str) {
    (
        item.format != FormatTag::Newline,
        item.item_id.len(),
        item.item_id.as_str(),
    )
}

fn order_entries(entries: &mut [(HostRecord, ChangeSet)], order: HostOrder) {
    match order {
        HostOrder::Recency => {
            entries.sort_by(|a, b| b.0.sample_timestamp.cmp(&a.0.sample_timestamp))
        }
        HostOrder::Name => entries.sort_by(|a, b| a.0.host_name.cmp(&b.0.host_name)),
    }
}
