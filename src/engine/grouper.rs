use indexmap::IndexMap;
use tracing::trace;

use crate::models::{
    ChangeGroup, ChangeSet, GroupBy, HostRecord, Signature, UnchangedPolicy, NO_DATA,
};

/// Grouping key of one host.
///
/// Hosts carrying the no-data sentinel get a key no real inventory can
/// produce in either mode, so they never merge with hosts that have data.
pub fn signature(group_by: GroupBy, record: &HostRecord, changes: &ChangeSet) -> Signature {
    match group_by {
        GroupBy::Diff => changes
            .installed
            .iter()
            .chain(&changes.removed)
            .cloned()
            .collect(),
        GroupBy::Inventory if changes.is_no_data() => vec![NO_DATA.to_string()],
        GroupBy::Inventory => record.new_packages.to_sorted_vec(),
    }
}

/// Group hosts by identical signature.
///
/// Groups iterate in first-seen order and members keep the order of
/// `entries`; callers sort `entries` beforehand to control report layout.
pub fn group(
    entries: Vec<(HostRecord, ChangeSet)>,
    group_by: GroupBy,
    unchanged: UnchangedPolicy,
) -> IndexMap<Signature, ChangeGroup> {
    let mut groups: IndexMap<Signature, ChangeGroup> = IndexMap::new();

    for (record, changes) in entries {
        let key = signature(group_by, &record, &changes);
        if key.is_empty() && unchanged == UnchangedPolicy::Exclude {
            trace!(host = %record.host_name, "skipping host with empty signature");
            continue;
        }

        groups
            .entry(key.clone())
            .or_insert_with(|| ChangeGroup {
                signature: key,
                changes,
                members: Vec::new(),
            })
            .members
            .push(record);
    }

    groups
}
