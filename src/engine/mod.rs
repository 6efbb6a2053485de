//! Inventory diff & grouping engine.
//!
//! - [`parser`] — raw inventory text → [`PackageSet`](crate::models::PackageSet).
//! - [`pairer`] — history samples → verified (old, new) pairs per host.
//! - [`diff`] — installed/removed packages of one pair.
//! - [`grouper`] — hosts with identical signatures → ordered groups.
//! - [`pipeline`] — runs the above against a [`MonitoringSource`].

use anyhow::Result;

use crate::models::{ChangeEvent, InventoryItem, RawSample, Window};

pub mod diff;
pub mod grouper;
pub mod pairer;
pub mod parser;
pub mod pipeline;

/// Queries the engine needs from the monitoring backend.
///
/// Calls are awaited one after another and never retried; any error aborts the run.
pub trait MonitoringSource {
    /// Package-change events fired within `window`, newest first.
    async fn change_events(&self, window: Window) -> Result<Vec<ChangeEvent>>;

    /// Inventory items holding the package lists of `host_ids`.
    async fn inventory_items(&self, host_ids: &[String]) -> Result<Vec<InventoryItem>>;

    /// Raw values of `items` within `window`. With a `limit` the result is
    /// sorted newest first, otherwise oldest first.
    async fn history(
        &self,
        items: &[InventoryItem],
        window: Window,
        limit: Option<usize>,
    ) -> Result<Vec<RawSample>>;
}
