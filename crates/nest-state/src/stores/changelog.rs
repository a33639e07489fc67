//! Mutation ledger for optimistic updates.
//!
//! Every optimistic mutation applies to memory first and confirms against
//! the backend in the background; the in-memory value is never rolled back.
//! The ledger makes that lifecycle observable: each persistence call is
//! recorded as pending and later resolved confirmed or failed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Outcome of a background persistence call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Pending,
    Confirmed,
    Failed,
}

/// One optimistic mutation and the state of its backend confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub seq: u64,
    /// Mutator that produced this record (e.g. `"add"`, `"mark_read"`).
    pub op: &'static str,
    pub status: MutationStatus,
}

#[derive(Debug, Default)]
struct Inner {
    records: Mutex<Vec<MutationRecord>>,
    next_seq: AtomicU64,
}

/// Shared, cheaply clonable mutation ledger.
#[derive(Debug, Clone, Default)]
pub struct Changelog {
    inner: Arc<Inner>,
}

impl Changelog {
    /// Records a new pending mutation and returns its sequence number.
    pub fn begin(&self, op: &'static str) -> u64 {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        self.inner
            .records
            .lock()
            .expect("changelog mutex poisoned")
            .push(MutationRecord {
                seq,
                op,
                status: MutationStatus::Pending,
            });
        seq
    }

    /// Resolves a pending mutation.
    pub fn resolve(&self, seq: u64, ok: bool) {
        let mut records = self
            .inner
            .records
            .lock()
            .expect("changelog mutex poisoned");
        if let Some(record) = records.iter_mut().find(|r| r.seq == seq) {
            record.status = if ok {
                MutationStatus::Confirmed
            } else {
                MutationStatus::Failed
            };
        }
    }

    /// Snapshot of all records, in begin order.
    pub fn records(&self) -> Vec<MutationRecord> {
        self.inner
            .records
            .lock()
            .expect("changelog mutex poisoned")
            .clone()
    }

    /// Number of mutations still awaiting confirmation.
    pub fn pending(&self) -> usize {
        self.inner
            .records
            .lock()
            .expect("changelog mutex poisoned")
            .iter()
            .filter(|r| r.status == MutationStatus::Pending)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_resolve_lifecycle() {
        let log = Changelog::default();
        let a = log.begin("add");
        let b = log.begin("remove");
        assert_eq!(log.pending(), 2);

        log.resolve(a, true);
        log.resolve(b, false);
        assert_eq!(log.pending(), 0);

        let records = log.records();
        assert_eq!(records[0].status, MutationStatus::Confirmed);
        assert_eq!(records[0].op, "add");
        assert_eq!(records[1].status, MutationStatus::Failed);
    }

    #[test]
    fn test_resolve_unknown_seq_is_ignored() {
        let log = Changelog::default();
        log.resolve(42, true);
        assert!(log.records().is_empty());
    }
}
