use crate::core::Result;
use crate::record::QueryRecord;
use std::sync::{Arc, Mutex};

/// Append-only history of intercepted queries, oldest first.
///
/// Records are shared with the log, so a record looked up here is the same
/// object a handler received; answering it through either path resolves the
/// suspended caller.
#[derive(Default)]
pub struct QueryLog {
    entries: Mutex<Vec<Arc<QueryRecord>>>,
}

impl QueryLog {
    pub(crate) fn push(&self, record: Arc<QueryRecord>) -> Result<()> {
        self.entries.lock()?.push(record);
        Ok(())
    }

    pub(crate) fn clear(&self) -> Result<()> {
        self.entries.lock()?.clear();
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.entries.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.entries.lock()?.is_empty())
    }

    pub fn first(&self) -> Result<Option<Arc<QueryRecord>>> {
        Ok(self.entries.lock()?.first().cloned())
    }

    pub fn last(&self) -> Result<Option<Arc<QueryRecord>>> {
        Ok(self.entries.lock()?.last().cloned())
    }

    /// The record at `index` in arrival order, if the log is that long.
    pub fn at(&self, index: usize) -> Result<Option<Arc<QueryRecord>>> {
        Ok(self.entries.lock()?.get(index).cloned())
    }

    /// Snapshot of every record seen so far.
    pub fn all(&self) -> Result<Vec<Arc<QueryRecord>>> {
        Ok(self.entries.lock()?.clone())
    }
}
