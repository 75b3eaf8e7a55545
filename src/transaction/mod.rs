// ============================================================================
// Transaction Scope Tracking Module
// ============================================================================
//
// Assigns step indices to queries within a logical transaction scope
// (the BEGIN..COMMIT/ROLLBACK span) and tracks scope lifecycle.
//
// Design Patterns Used:
// - State Pattern: scope state management (Active, Committed, RolledBack)
// - Registry: scopes looked up by ID, never by connection identity
//
// ============================================================================

pub mod manager;
pub mod scope;

pub use manager::ScopeManager;
pub use scope::{ScopeState, TransactionId, TransactionScope};
