//! Snapshot comparison between two consecutive polls of one target.
//!
//! Records are compared by full structural equality, status included. A
//! status change therefore shows up as the old-status record going offline
//! and the new-status record appearing.

use ahash::AHashSet as HashSet;

use crate::model::InstanceRecord;

/// Returns the records of `old` that have no equal counterpart in `new`.
///
/// An empty `new` retires everything in `old`; an empty `old` retires
/// nothing. The result keeps the order of `old`.
pub fn offline(old: &[InstanceRecord], new: &[InstanceRecord]) -> Vec<InstanceRecord> {
    if new.is_empty() {
        return old.to_vec();
    }
    if old.is_empty() {
        return Vec::new();
    }

    let current: HashSet<&InstanceRecord> = new.iter().collect();
    old.iter()
        .filter(|record| !current.contains(record))
        .cloned()
        .collect()
}

/// Returns the records of `new` that were not present in `old`.
pub fn appeared(old: &[InstanceRecord], new: &[InstanceRecord]) -> Vec<InstanceRecord> {
    let previous: HashSet<&InstanceRecord> = old.iter().collect();
    new.iter()
        .filter(|record| !previous.contains(record))
        .cloned()
        .collect()
}
