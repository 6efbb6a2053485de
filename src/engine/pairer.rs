use std::cmp::Ordering;

use tracing::{debug, trace};

use crate::engine::parser::parse;
use crate::error::EngineError;
use crate::models::{HostRecord, InventoryItem, RawSample, Window};

/// How the old/new sample of each item is picked out of the history list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingStrategy {
    /// Exactly two samples per item, history sorted newest first:
    /// the first half holds the newest samples, the second half the oldest.
    FixedCount,
    /// Oldest and newest sample of each item within the window.
    Range,
}

/// Join each item with its old/new samples and parse both into package sets.
///
/// Items, newest samples and oldest samples are sorted independently by item
/// id and then checked index by index. The history API returns flat,
/// unlabelled lists, so a mismatch at any index is an [`EngineError::Alignment`].
pub fn pair(
    items: &[InventoryItem],
    samples: &[RawSample],
    window: Option<Window>,
    strategy: PairingStrategy,
) -> Result<Vec<HostRecord>, EngineError> {
    let samples: Vec<&RawSample> = samples
        .iter()
        .filter(|s| window.map_or(true, |w| w.contains(s.timestamp)))
        .collect();

    let (mut items, mut newest, mut oldest) = match strategy {
        PairingStrategy::FixedCount => split_fixed_count(items, &samples)?,
        PairingStrategy::Range => select_range(items, &samples),
    };

    items.sort_by(|a, b| cmp_item_ids(&a.item_id, &b.item_id));
    newest.sort_by(|a, b| cmp_item_ids(&a.item_id, &b.item_id));
    oldest.sort_by(|a, b| cmp_item_ids(&a.item_id, &b.item_id));

    verify_alignment(&items, &newest, &oldest)?;

    let records = items
        .iter()
        .zip(newest.iter().zip(oldest.iter()))
        .map(|(item, (new, old))| {
            trace!(
                item = %item.item_id,
                sample_host = %new.host_id,
                sample_format = %new.format,
                new = new.timestamp,
                old = old.timestamp,
                "paired samples"
            );
            HostRecord {
                host_id: item.host_id.clone(),
                host_name: item.host_name.clone(),
                item_id: Some(item.item_id.clone()),
                sample_timestamp: Some(new.timestamp),
                old_packages: parse(&old.value, item.format),
                new_packages: parse(&new.value, item.format),
            }
        })
        .collect::<Vec<_>>();

    debug!(records = records.len(), ?strategy, "paired inventory snapshots");
    Ok(records)
}

type Candidates<'a> = (
    Vec<&'a InventoryItem>,
    Vec<&'a RawSample>,
    Vec<&'a RawSample>,
);

fn split_fixed_count<'a>(
    items: &'a [InventoryItem],
    samples: &[&'a RawSample],
) -> Result<Candidates<'a>, EngineError> {
    let expected = items.len() * 2;
    if samples.len() != expected {
        return Err(EngineError::InsufficientHistory {
            expected,
            actual: samples.len(),
        });
    }

    let (newest, oldest) = samples.split_at(items.len());
    Ok((items.iter().collect(), newest.to_vec(), oldest.to_vec()))
}

fn select_range<'a>(items: &'a [InventoryItem], samples: &[&'a RawSample]) -> Candidates<'a> {
    let mut kept = Vec::new();
    let mut newest = Vec::new();
    let mut oldest = Vec::new();

    for item in items {
        let matching = samples.iter().copied().filter(|s| s.item_id == item.item_id);
        let first = matching.clone().min_by_key(|s| s.timestamp);
        let last = matching.max_by_key(|s| s.timestamp);

        match (first, last) {
            (Some(first), Some(last)) => {
                kept.push(item);
                oldest.push(first);
                newest.push(last);
            }
            _ => debug!(item = %item.item_id, host = %item.host_name, "no history in window"),
        }
    }

    (kept, newest, oldest)
}

fn verify_alignment(
    items: &[&InventoryItem],
    newest: &[&RawSample],
    oldest: &[&RawSample],
) -> Result<(), EngineError> {
    let len = items.len().max(newest.len()).max(oldest.len());
    for index in 0..len {
        let item = items.get(index).map(|i| i.item_id.as_str());
        let new = newest.get(index).map(|s| s.item_id.as_str());
        let old = oldest.get(index).map(|s| s.item_id.as_str());

        if item.is_none() || item != new || item != old {
            return Err(EngineError::Alignment {
                index,
                item: item.unwrap_or("-").to_string(),
                new: new.unwrap_or("-").to_string(),
                old: old.unwrap_or("-").to_string(),
            });
        }
    }
    Ok(())
}

/// Item ids are decimal strings; shorter ids sort first so `"9" < "10"`.
fn cmp_item_ids(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
