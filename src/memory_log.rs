//! Session-scoped, append-only log of completed searches.

use crate::model::MemoryRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared handle; clones see the same records.
#[derive(Debug, Clone, Default)]
pub struct ResultLog {
    records: Arc<RwLock<Vec<MemoryRecord>>>,
    next_seq: Arc<AtomicU64>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries are kept in the order their searches completed.
    pub(crate) fn append(&self, record: MemoryRecord) {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<MemoryRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Id for a record whose reply carried no `operation_id`.
    /// Millisecond timestamps alone collide on fast successive searches, so a
    /// per-session sequence number is appended.
    pub(crate) fn fallback_id(&self) -> String {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let millis = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        format!("{millis}-{seq}")
    }
}

/// Local wall-clock time for record display, falling back to UTC when the
/// local offset cannot be determined.
pub(crate) fn display_timestamp() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| "now".into())
}
