use crate::core::{MockError, Result, Row, Value, rows_from_json};
use crate::transaction::TransactionId;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::debug;

/// Operation kind of an intercepted query.
///
/// Derived from the client call that produced the query, never parsed out of
/// the SQL text. `Raw` covers transaction-control statements (BEGIN, COMMIT,
/// ROLLBACK, savepoints) and free-form SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Select,
    Insert,
    Update,
    Del,
    First,
    Pluck,
    Count,
    Raw,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Del => "del",
            Self::First => "first",
            Self::Pluck => "pluck",
            Self::Count => "count",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an observer hands back for one intercepted query.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A canned result set
    Rows(Vec<Row>),

    /// An explicit failure, propagated to the caller verbatim
    Failure(String),
}

/// Normalized representation of one intercepted query.
///
/// The record itself is immutable; the outcome is attached separately through
/// `respond`/`respond_json`/`reject` and resolves the suspended caller. Only
/// the first outcome takes effect, later attempts return `AlreadyResponded`.
///
/// Records are shared (`Arc`) between the suspended caller, the query log and
/// every observer, so an observer may hold on to one and answer it later from
/// spawned async work.
pub struct QueryRecord {
    sql: String,
    bindings: Vec<Value>,
    method: Method,
    transaction_id: Option<TransactionId>,
    step: u32,
    responder: Mutex<Option<oneshot::Sender<Outcome>>>,
}

impl QueryRecord {
    pub(crate) fn new(
        sql: String,
        bindings: Vec<Value>,
        method: Method,
        transaction_id: Option<TransactionId>,
        step: u32,
    ) -> (Arc<Self>, oneshot::Receiver<Outcome>) {
        let (sender, receiver) = oneshot::channel();
        let record = Arc::new(Self {
            sql,
            bindings,
            method,
            transaction_id,
            step,
            responder: Mutex::new(Some(sender)),
        });
        (record, receiver)
    }

    /// The literal statement text, dialect quoting preserved
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameter values in positional order
    pub fn bindings(&self) -> &[Value] {
        &self.bindings
    }

    /// Operation kind of the originating call
    pub fn method(&self) -> Method {
        self.method
    }

    /// The logical transaction scope, or `None` for an untransacted query
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    /// 1-based index of this query within its scope
    pub fn step(&self) -> u32 {
        self.step
    }

    /// Whether an outcome has already been supplied
    pub fn is_answered(&self) -> Result<bool> {
        let responder = self.responder.lock()?;
        Ok(responder.is_none())
    }

    /// Resolve the suspended caller with a canned result set.
    ///
    /// # Errors
    /// Returns `AlreadyResponded` if this record already has an outcome.
    pub fn respond(&self, rows: Vec<Row>) -> Result<()> {
        self.supply(Outcome::Rows(rows))
    }

    /// Resolve the suspended caller with rows written as a JSON array of
    /// objects.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// tracker.on_query(|record, _step| {
    ///     record.respond_json(serde_json::json!([{ "id": 1, "foo": "bar" }])).unwrap();
    /// })?;
    /// ```
    pub fn respond_json(&self, rows: serde_json::Value) -> Result<()> {
        self.supply(Outcome::Rows(rows_from_json(rows)?))
    }

    /// Reject the suspended caller with a failure carrying exactly this
    /// message.
    ///
    /// # Errors
    /// Returns `AlreadyResponded` if this record already has an outcome.
    pub fn reject(&self, message: impl Into<String>) -> Result<()> {
        self.supply(Outcome::Failure(message.into()))
    }

    fn supply(&self, outcome: Outcome) -> Result<()> {
        let mut responder = self.responder.lock()?;
        match responder.take() {
            Some(sender) => {
                if sender.send(outcome).is_err() {
                    // The caller gave up on this query before the answer came
                    debug!(
                        "outcome for {} query at step {} had no waiting caller",
                        self.method, self.step
                    );
                }
                Ok(())
            }
            None => Err(MockError::AlreadyResponded),
        }
    }

    /// JSON summary of the record (without its outcome), handy for snapshots
    /// and golden assertions.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "sql": self.sql,
            "bindings": self.bindings,
            "method": self.method,
            "transaction": self.transaction_id.map(|id| id.as_u64()),
            "step": self.step,
        })
    }
}

impl fmt::Debug for QueryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRecord")
            .field("sql", &self.sql)
            .field("bindings", &self.bindings)
            .field("method", &self.method)
            .field("transaction_id", &self.transaction_id)
            .field("step", &self.step)
            .finish()
    }
}

impl fmt::Display for QueryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (step {}): {}", self.method, self.step, self.sql)
    }
}
