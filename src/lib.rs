// ============================================================================
// QueryMock Library
// ============================================================================

pub mod core;
pub mod record;
pub mod result;
pub mod tracker;
pub mod transaction;
pub mod transport;

// Re-export main types for convenience
pub use core::{MockError, Result, Row, Value, rows_from_json};
pub use record::{Method, Outcome, QueryRecord};
pub use result::QueryResult;
pub use transaction::TransactionId;

// Re-export tracker API
pub use tracker::{
    Tracker,
    config::{SavepointMode, TrackerConfig},
    log::QueryLog,
    registry::{HandlerId, QueryHandler},
};
pub use transport::{Connection, Interceptable, Statement, Transport};

use async_trait::async_trait;
use std::mem;
use std::sync::{Arc, RwLock};

// ============================================================================
// High-level Client API
// ============================================================================

/// Transport for clients built before a backend is wired up. Every
/// acquisition fails until a tracker (or a real transport) takes the slot.
struct DisconnectedTransport;

#[async_trait]
impl Transport for DisconnectedTransport {
    async fn acquire(&self) -> Result<Box<dyn Connection>> {
        Err(MockError::Disconnected)
    }
}

/// Reference client with a swappable transport slot.
///
/// This is the shape a real driver adapter takes: hold the transport behind
/// a lock, implement [`Interceptable`] over that slot, and route every query
/// through whatever transport is currently installed. The slot is behind a
/// read-write lock, so an install or uninstall never waits on an in-flight
/// query.
///
/// # Examples
///
/// ```
/// use querymock::{Client, Statement, Tracker};
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> querymock::Result<()> {
/// let client = Arc::new(Client::unconnected());
/// let tracker = Tracker::new();
/// tracker.install(&client)?;
///
/// tracker.on_query(|record, _step| {
///     record
///         .respond_json(serde_json::json!([{"id": 1, "name": "Alice"}]))
///         .unwrap();
/// })?;
///
/// let users = client.query(Statement::select("SELECT * FROM users")).await?;
/// assert_eq!(users.row_count(), 1);
///
/// tracker.uninstall(&client)?;
/// # Ok(())
/// # }
/// ```
pub struct Client {
    transport: RwLock<Arc<dyn Transport>>,
}

impl Client {
    /// A client with no backend.
    ///
    /// Useful in tests that install a tracker immediately; any query issued
    /// before that fails with [`MockError::Disconnected`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use querymock::Client;
    /// let client = Client::unconnected();
    /// ```
    pub fn unconnected() -> Self {
        Self::with_transport(Arc::new(DisconnectedTransport))
    }

    /// A client backed by the given transport. Wrap a real driver's pool in
    /// the [`Transport`] trait to build a production client.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: RwLock::new(transport),
        }
    }

    /// Acquire a connection for multiple statements or a transaction.
    ///
    /// The connection keeps using the transport it was acquired from even if
    /// the slot is swapped while it is alive.
    ///
    /// # Examples
    ///
    /// ```
    /// # use querymock::{Client, Statement, Tracker};
    /// # use std::sync::Arc;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> querymock::Result<()> {
    /// # let client = Arc::new(Client::unconnected());
    /// # let tracker = Tracker::new();
    /// # tracker.install(&client)?;
    /// # tracker.on_query(|record, _step| record.respond(Vec::new()).unwrap())?;
    /// let mut conn = client.connection().await?;
    ///
    /// conn.begin().await?;
    /// conn.execute(Statement::insert("INSERT INTO users (name) VALUES (?)").bind("Alice"))
    ///     .await?;
    /// conn.commit().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connection(&self) -> Result<ManagedConnection> {
        let transport = self.transport()?;
        let inner = transport.acquire().await?;
        Ok(ManagedConnection { inner })
    }

    /// Execute one statement on a fresh connection.
    ///
    /// # Examples
    ///
    /// ```
    /// # use querymock::{Client, Statement, Tracker};
    /// # use std::sync::Arc;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> querymock::Result<()> {
    /// # let client = Arc::new(Client::unconnected());
    /// # let tracker = Tracker::new();
    /// # tracker.install(&client)?;
    /// # tracker.on_query(|record, _step| record.respond(Vec::new()).unwrap())?;
    /// let result = client.query(Statement::del("DELETE FROM users")).await?;
    /// assert!(result.is_empty());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn query(&self, statement: Statement) -> Result<QueryResult> {
        let mut connection = self.connection().await?;
        connection.execute(statement).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::unconnected()
    }
}

impl Interceptable for Client {
    fn transport(&self) -> Result<Arc<dyn Transport>> {
        Ok(Arc::clone(&*self.transport.read()?))
    }

    fn replace_transport(&self, transport: Arc<dyn Transport>) -> Result<Arc<dyn Transport>> {
        let mut slot = self.transport.write()?;
        Ok(mem::replace(&mut *slot, transport))
    }
}

/// A connection checked out from a [`Client`].
pub struct ManagedConnection {
    inner: Box<dyn Connection>,
}

impl ManagedConnection {
    pub async fn execute(&mut self, statement: Statement) -> Result<QueryResult> {
        self.inner.execute(statement).await
    }

    pub async fn begin(&mut self) -> Result<()> {
        self.inner.begin().await
    }

    pub async fn commit(&mut self) -> Result<()> {
        self.inner.commit().await
    }

    pub async fn rollback(&mut self) -> Result<()> {
        self.inner.rollback().await
    }

    pub fn is_in_transaction(&self) -> bool {
        self.inner.is_in_transaction()
    }
}
