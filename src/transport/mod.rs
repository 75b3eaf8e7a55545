// ============================================================================
// Transport Seam
// ============================================================================
//
// The two entry points a database client must expose for interception:
// connection acquisition (Transport) and statement execution (Connection).
// A client that can have its transport swapped implements Interceptable;
// installing a tracker replaces the slot with the mock transport and
// uninstalling restores the original.
//
// ============================================================================

pub(crate) mod mock;
pub mod statement;

pub use statement::Statement;

use crate::core::Result;
use crate::result::QueryResult;
use async_trait::async_trait;
use std::sync::Arc;

/// One live connection's call surface.
///
/// `&mut self` on the methods serializes issuance per connection, which is
/// what keeps step numbers gap-free within a transaction scope.
#[async_trait]
pub trait Connection: Send {
    /// Execute a classified statement and wait for its result.
    async fn execute(&mut self, statement: Statement) -> Result<QueryResult>;

    /// Open a transaction (or a savepoint when one is already open).
    async fn begin(&mut self) -> Result<()>;

    /// Commit the innermost transaction or savepoint.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the innermost transaction or savepoint.
    async fn rollback(&mut self) -> Result<()>;

    /// Whether a transaction is currently open on this connection.
    fn is_in_transaction(&self) -> bool;
}

/// Connection acquisition: the entry point a tracker substitutes.
///
/// Wrap a real driver's pool to implement this trait for production use; the
/// mock transport implements it for tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Acquire a connection.
    async fn acquire(&self) -> Result<Box<dyn Connection>>;
}

/// A client whose transport can be swapped in place.
///
/// This is the full adapter contract: expose the current transport and allow
/// replacing it, returning whatever was there before. Both operations are
/// fallible so a client guarding its slot with a lock can report poisoning.
pub trait Interceptable: Send + Sync {
    /// The transport currently in the slot.
    fn transport(&self) -> Result<Arc<dyn Transport>>;

    /// Put a new transport in the slot, returning the previous one.
    fn replace_transport(&self, transport: Arc<dyn Transport>) -> Result<Arc<dyn Transport>>;
}
