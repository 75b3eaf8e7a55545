use crate::core::Result;
use crate::record::QueryRecord;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Callback invoked for every intercepted query.
///
/// Handlers run on the task that issued the query. A handler may answer the
/// record immediately, or move it to another task and return, leaving the
/// caller suspended until that task responds.
pub type QueryHandler = Arc<dyn Fn(Arc<QueryRecord>, u32) + Send + Sync>;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one registration so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum HandlerMode {
    Persistent,
    Once,
}

struct Registration {
    id: HandlerId,
    mode: HandlerMode,
    handler: QueryHandler,
}

/// Ordered collection of query handlers.
///
/// Dispatch takes a snapshot of the current entries and consumes one-shot
/// registrations under the same lock, before any handler runs. A handler that
/// registers or removes handlers from inside its own invocation therefore
/// never deadlocks, and a one-shot handler fires exactly once even if its
/// query triggers another dispatch.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    entries: Mutex<Vec<Registration>>,
}

impl HandlerRegistry {
    pub(crate) fn add(&self, handler: QueryHandler, once: bool) -> Result<HandlerId> {
        let id = HandlerId::next();
        let mode = if once {
            HandlerMode::Once
        } else {
            HandlerMode::Persistent
        };
        self.entries.lock()?.push(Registration { id, mode, handler });
        Ok(id)
    }

    /// Remove one registration. Returns whether it was present.
    pub(crate) fn remove(&self, id: HandlerId) -> Result<bool> {
        let mut entries = self.entries.lock()?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        Ok(entries.len() != before)
    }

    pub(crate) fn clear(&self) -> Result<()> {
        self.entries.lock()?.clear();
        Ok(())
    }

    pub(crate) fn len(&self) -> Result<usize> {
        Ok(self.entries.lock()?.len())
    }

    /// Registration-ordered snapshot for one dispatch.
    pub(crate) fn snapshot_for_dispatch(&self) -> Result<Vec<QueryHandler>> {
        let mut entries = self.entries.lock()?;
        let snapshot = entries
            .iter()
            .map(|entry| Arc::clone(&entry.handler))
            .collect();
        entries.retain(|entry| entry.mode == HandlerMode::Persistent);
        Ok(snapshot)
    }
}
