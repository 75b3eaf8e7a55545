// ============================================================================
// Mock Transport
// ============================================================================
//
// The instrumented stand-in that takes the place of a real transport while a
// tracker is installed. Every call on a mock connection becomes a QueryRecord:
// the record is numbered by its transaction scope, handed to the registered
// observers, and the caller is parked on the record's response channel until
// an observer supplies an outcome. Nothing is ever forwarded to a network.
//
// ============================================================================

use crate::core::{MockError, Result, Value};
use crate::record::{Method, Outcome, QueryRecord};
use crate::result::QueryResult;
use crate::tracker::TrackerShared;
use crate::tracker::config::SavepointMode;
use crate::transaction::TransactionId;
use crate::transport::{Connection, Statement, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) struct MockTransport {
    shared: Arc<TrackerShared>,
}

impl MockTransport {
    pub(crate) fn new(shared: Arc<TrackerShared>) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(MockConnection::new(Arc::clone(&self.shared))))
    }
}

/// Transaction nesting on one connection: the outer scope plus any savepoints.
/// In `ContinueParent` mode a savepoint frame carries no scope of its own and
/// queries keep numbering on the outer counter; in `IndependentScope` mode the
/// frame owns a child scope counting from 1.
enum Frame {
    Outer(TransactionId),
    Savepoint {
        name: String,
        scope: Option<TransactionId>,
    },
}

struct MockConnection {
    shared: Arc<TrackerShared>,
    frames: Vec<Frame>,
}

impl MockConnection {
    fn new(shared: Arc<TrackerShared>) -> Self {
        Self {
            shared,
            frames: Vec::new(),
        }
    }

    /// The scope queries on this connection currently belong to.
    fn current_scope(&self) -> Option<TransactionId> {
        for frame in self.frames.iter().rev() {
            match frame {
                Frame::Outer(id) => return Some(*id),
                Frame::Savepoint {
                    scope: Some(id), ..
                } => return Some(*id),
                Frame::Savepoint { scope: None, .. } => continue,
            }
        }
        None
    }

    fn next_savepoint_name(&self) -> String {
        let depth = self
            .frames
            .iter()
            .filter(|frame| matches!(frame, Frame::Savepoint { .. }))
            .count()
            + 1;
        format!("sp_{}", depth)
    }

    /// Build the record, number it, notify observers, and park until one of
    /// them responds. Statements outside any transaction get a synthetic
    /// single-query scope: no ID, always step 1.
    async fn dispatch(
        &self,
        sql: String,
        bindings: Vec<Value>,
        method: Method,
        transaction_id: Option<TransactionId>,
    ) -> Result<QueryResult> {
        let step = match transaction_id {
            Some(id) => self.shared.scopes.next_step(id)?,
            None => 1,
        };

        let (record, outcome) = QueryRecord::new(sql, bindings, method, transaction_id, step);
        debug!("intercepted {}", record);
        self.shared.log.push(Arc::clone(&record))?;

        let handlers = self.shared.registry.snapshot_for_dispatch()?;
        if handlers.is_empty() {
            warn!("no query handlers registered; the caller stays suspended until one responds");
        }
        for handler in handlers {
            handler(Arc::clone(&record), step);
        }
        // Only the log and the handlers hold the record now; if every holder
        // drops it unanswered, the await below resolves to an error instead
        // of parking forever
        drop(record);

        match outcome.await {
            Ok(Outcome::Rows(rows)) => Ok(QueryResult::new(rows)),
            Ok(Outcome::Failure(message)) => Err(MockError::QueryFailure(message)),
            // The sender lives inside the record, so closure means the record
            // itself was dropped without an answer
            Err(_) => Err(MockError::QueryFailure(
                "query record dropped before a response was supplied".into(),
            )),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&mut self, statement: Statement) -> Result<QueryResult> {
        let (sql, bindings, method, token) = statement.into_parts();
        // An explicit correlation token wins over this connection's own stack
        let scope = token.or_else(|| self.current_scope());
        self.dispatch(sql, bindings, method, scope).await
    }

    async fn begin(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            let id = self.shared.scopes.begin()?;
            self.frames.push(Frame::Outer(id));
            match self
                .dispatch("BEGIN;".to_string(), Vec::new(), Method::Raw, Some(id))
                .await
            {
                Ok(_) => Ok(()),
                Err(err) => {
                    self.frames.pop();
                    let _ = self.shared.scopes.rollback(id);
                    Err(err)
                }
            }
        } else {
            let name = self.next_savepoint_name();
            let scope = match self.shared.config.savepoint_mode {
                SavepointMode::ContinueParent => None,
                SavepointMode::IndependentScope => Some(self.shared.scopes.begin()?),
            };
            let sql = format!("SAVEPOINT {};", name);
            self.frames.push(Frame::Savepoint { name, scope });
            let dispatch_scope = scope.or_else(|| self.current_scope());
            match self.dispatch(sql, Vec::new(), Method::Raw, dispatch_scope).await {
                Ok(_) => Ok(()),
                Err(err) => {
                    self.frames.pop();
                    if let Some(id) = scope {
                        let _ = self.shared.scopes.rollback(id);
                    }
                    Err(err)
                }
            }
        }
    }

    async fn commit(&mut self) -> Result<()> {
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => return Err(MockError::NoActiveTransaction),
        };

        match frame {
            Frame::Outer(id) => {
                match self
                    .dispatch("COMMIT;".to_string(), Vec::new(), Method::Raw, Some(id))
                    .await
                {
                    Ok(_) => self.shared.scopes.commit(id),
                    Err(err) => {
                        // Observer rejected the COMMIT: the transaction stays open
                        self.frames.push(Frame::Outer(id));
                        Err(err)
                    }
                }
            }
            Frame::Savepoint { name, scope } => {
                let sql = format!("RELEASE SAVEPOINT {};", name);
                let dispatch_scope = scope.or_else(|| self.current_scope());
                match self.dispatch(sql, Vec::new(), Method::Raw, dispatch_scope).await {
                    Ok(_) => {
                        if let Some(id) = scope {
                            self.shared.scopes.commit(id)?;
                        }
                        Ok(())
                    }
                    Err(err) => {
                        self.frames.push(Frame::Savepoint { name, scope });
                        Err(err)
                    }
                }
            }
        }
    }

    async fn rollback(&mut self) -> Result<()> {
        let frame = match self.frames.pop() {
            Some(frame) => frame,
            None => {
                // SQL standard: ROLLBACK outside a transaction is a warning,
                // not an error
                warn!("ROLLBACK issued with no open transaction; ignoring");
                return Ok(());
            }
        };

        match frame {
            Frame::Outer(id) => {
                match self
                    .dispatch("ROLLBACK;".to_string(), Vec::new(), Method::Raw, Some(id))
                    .await
                {
                    Ok(_) => self.shared.scopes.rollback(id),
                    Err(err) => {
                        self.frames.push(Frame::Outer(id));
                        Err(err)
                    }
                }
            }
            Frame::Savepoint { name, scope } => {
                let sql = format!("ROLLBACK TO SAVEPOINT {};", name);
                let dispatch_scope = scope.or_else(|| self.current_scope());
                match self.dispatch(sql, Vec::new(), Method::Raw, dispatch_scope).await {
                    Ok(_) => {
                        if let Some(id) = scope {
                            self.shared.scopes.rollback(id)?;
                        }
                        Ok(())
                    }
                    Err(err) => {
                        self.frames.push(Frame::Savepoint { name, scope });
                        Err(err)
                    }
                }
            }
        }
    }

    fn is_in_transaction(&self) -> bool {
        !self.frames.is_empty()
    }
}
