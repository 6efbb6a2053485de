//! Fatal engine errors.
//!
//! Both variants abort the run: every group in the report depends on the
//! per-host joins being correct, so no partial report is produced.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The history query returned a different number of samples than the
    /// fixed-count pairing needs (two per item).
    #[error("history has {actual} samples, expected {expected} (two per item)")]
    InsufficientHistory { expected: usize, actual: usize },

    /// Items, newest samples and oldest samples disagree on the item id at
    /// some index after sorting.
    #[error(
        "item lists are misaligned at index {index}: item {item}, new sample {new}, old sample {old}"
    )]
    Alignment {
        index: usize,
        item: String,
        new: String,
        old: String,
    },
}
