// ============================================================================
// Transaction Scope State
// ============================================================================
//
// Implements the State Pattern for scope lifecycle management.
// Each scope moves through defined states: Active -> Committed/RolledBack
//
// A scope is the step-counting context spanning BEGIN..COMMIT/ROLLBACK:
// - The counter starts at 0 and is incremented before every query
// - The first query in a scope therefore observes step 1
// - Closed scopes refuse further steps instead of silently counting on
//
// ============================================================================

use crate::core::{MockError, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global scope ID counter
static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a transaction scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Generate a new unique transaction ID
    pub fn new() -> Self {
        TransactionId(NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn_{}", self.0)
    }
}

/// Scope state following the State Pattern
///
/// State transitions:
/// ```text
/// Active ──commit──> Committed
///   │
///   └──rollback──> RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// Scope is open and accepts further steps
    Active,

    /// Scope was closed by a successful COMMIT
    Committed,

    /// Scope was closed by a ROLLBACK
    RolledBack,
}

impl ScopeState {
    /// Check if the scope can still number queries
    pub fn is_active(&self) -> bool {
        matches!(self, ScopeState::Active)
    }

    /// Check if the scope is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScopeState::Committed | ScopeState::RolledBack)
    }
}

impl std::fmt::Display for ScopeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScopeState::Active => write!(f, "ACTIVE"),
            ScopeState::Committed => write!(f, "COMMITTED"),
            ScopeState::RolledBack => write!(f, "ROLLED BACK"),
        }
    }
}

/// One logical transaction's step-counting context
///
/// # Thread Safety
/// This structure is mutated only under the `ScopeManager` lock.
#[derive(Debug)]
pub struct TransactionScope {
    /// Unique scope identifier
    id: TransactionId,

    /// Steps handed out so far (the last assigned step index)
    counter: u32,

    /// Current state (Active, Committed, RolledBack)
    state: ScopeState,
}

impl TransactionScope {
    /// Create a new active scope with the given ID
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            counter: 0,
            state: ScopeState::Active,
        }
    }

    /// Get the scope ID
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Get the current state
    pub fn state(&self) -> ScopeState {
        self.state
    }

    /// Get the last step index handed out (0 before the first query)
    pub fn current_step(&self) -> u32 {
        self.counter
    }

    /// Increment the step counter and return the new step index
    ///
    /// # Errors
    /// Returns `ScopeClosed` if the scope is no longer active
    pub fn next_step(&mut self) -> Result<u32> {
        if !self.state.is_active() {
            return Err(MockError::ScopeClosed(self.id));
        }

        self.counter += 1;
        Ok(self.counter)
    }

    /// Mark the scope as committed
    ///
    /// # Errors
    /// Returns `ScopeClosed` if the scope is no longer active
    pub fn commit(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Err(MockError::ScopeClosed(self.id));
        }

        self.state = ScopeState::Committed;
        Ok(())
    }

    /// Mark the scope as rolled back
    ///
    /// # Errors
    /// Returns `ScopeClosed` if the scope is no longer active
    pub fn rollback(&mut self) -> Result<()> {
        if !self.state.is_active() {
            return Err(MockError::ScopeClosed(self.id));
        }

        self.state = ScopeState::RolledBack;
        Ok(())
    }
}
