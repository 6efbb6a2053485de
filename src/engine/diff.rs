use crate::models::{ChangeSet, PackageSet};

/// Compute installed (`new − old`) and removed (`old − new`) packages, ascending.
pub fn diff(old: &PackageSet, new: &PackageSet) -> ChangeSet {
    ChangeSet {
        installed: new.difference(old),
        removed: old.difference(new),
    }
}
