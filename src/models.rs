use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Placeholder package name used when a host has no usable history.
pub const NO_DATA: &str = "No Data";

/// Text encoding of a raw package-list sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatTag {
    /// One package per line (`dpkg`-style inventories).
    Newline,
    /// `[rpm] a-1.0, b-2.0` style inventories.
    BracketedCsv,
}

impl std::fmt::Display for FormatTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatTag::Newline => write!(f, "newline"),
            FormatTag::BracketedCsv => write!(f, "bracketed-csv"),
        }
    }
}

/// One timestamped value of an inventory item, as returned by the history query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSample {
    pub item_id: String,
    pub host_id: String,
    pub timestamp: i64,
    pub value: String,
    pub format: FormatTag,
}

/// Inclusive time window in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
    pub from: i64,
    pub till: i64,
}

impl Window {
    pub fn new(from: i64, till: i64) -> Self {
        Window { from, till }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.from <= timestamp && timestamp <= self.till
    }
}

/// A "packages changed" event fired for a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub timestamp: i64,
    pub host_id: String,
    pub host_name: String,
}

/// The inventory item that holds a host's package list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryItem {
    pub item_id: String,
    pub host_id: String,
    pub host_name: String,
    pub format: FormatTag,
}

/// Installed package identifiers of one host at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageSet(BTreeSet<String>);

impl PackageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate packages in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Packages present in `self` but not in `other`, ascending.
    pub fn difference(&self, other: &PackageSet) -> Vec<String> {
        self.0.difference(&other.0).cloned().collect()
    }

    pub fn to_sorted_vec(&self) -> Vec<String> {
        self.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for PackageSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        PackageSet(iter.into_iter().map(Into::into).collect())
    }
}

/// A host joined with the old/new package sets of its inventory item.
///
/// Hosts without resolvable history are represented by [`HostRecord::missing`]:
/// no item, no timestamp and empty package sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostRecord {
    pub host_id: String,
    pub host_name: String,
    pub item_id: Option<String>,
    pub sample_timestamp: Option<i64>,
    #[serde(skip)]
    pub old_packages: PackageSet,
    #[serde(skip)]
    pub new_packages: PackageSet,
}

impl HostRecord {
    pub fn missing(host_id: impl Into<String>, host_name: impl Into<String>) -> Self {
        HostRecord {
            host_id: host_id.into(),
            host_name: host_name.into(),
            item_id: None,
            sample_timestamp: None,
            old_packages: PackageSet::new(),
            new_packages: PackageSet::new(),
        }
    }
}

/// Packages installed and removed between two snapshots, both ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub installed: Vec<String>,
    pub removed: Vec<String>,
}

impl ChangeSet {
    /// Sentinel for hosts without a snapshot pair.
    pub fn no_data() -> Self {
        ChangeSet {
            installed: vec![NO_DATA.to_string()],
            removed: vec![NO_DATA.to_string()],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty() && self.removed.is_empty()
    }

    pub fn is_no_data(&self) -> bool {
        *self == Self::no_data()
    }
}

/// Grouping key: `installed ++ removed`, or the full sorted inventory.
pub type Signature = Vec<String>;

/// Hosts sharing one change signature, in the order they were supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeGroup {
    pub signature: Signature,
    /// Changes of the first member; identical for all members in diff mode.
    pub changes: ChangeSet,
    pub members: Vec<HostRecord>,
}

/// What hosts are grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupBy {
    Diff,
    Inventory,
}

impl std::fmt::Display for GroupBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupBy::Diff => write!(f, "diff"),
            GroupBy::Inventory => write!(f, "inventory"),
        }
    }
}

/// How the query windows are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowingKind {
    /// Anchor history on the newest change event; two samples per item.
    EventDriven,
    /// Trailing interval ending now.
    Fixed,
    /// Explicit `from`/`till` range.
    Range,
}

impl std::fmt::Display for WindowingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowingKind::EventDriven => write!(f, "event-driven"),
            WindowingKind::Fixed => write!(f, "fixed"),
            WindowingKind::Range => write!(f, "range"),
        }
    }
}

/// What happens to hosts that have no resolvable history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingHostPolicy {
    Sentinel,
    Drop,
}

/// Whether hosts with an empty signature are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnchangedPolicy {
    Exclude,
    Include,
}

/// Order applied to host records before grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostOrder {
    /// Newest sample first; hosts without data last.
    Recency,
    Name,
}
