// ============================================================================
// Scope Manager
// ============================================================================

use super::{ScopeState, TransactionId, TransactionScope};
use crate::core::{MockError, Result};
use std::collections::HashMap;
use std::sync::Mutex;

/// Registry of transaction scopes, keyed by `TransactionId`.
///
/// Scopes are looked up by identifier, never by physical connection: a pooled
/// connection can be reused across unrelated scopes, and a foreign adapter can
/// route a statement into a scope by carrying the ID as its correlation token.
///
/// Closed scopes are kept (in their terminal state) until `clear`, so a late
/// step request reports "closed" rather than pretending the scope never
/// existed.
pub struct ScopeManager {
    scopes: Mutex<HashMap<TransactionId, TransactionScope>>,
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeManager {
    pub fn new() -> Self {
        Self {
            scopes: Mutex::new(HashMap::new()),
        }
    }

    /// Open a new scope and return its ID
    pub fn begin(&self) -> Result<TransactionId> {
        let id = TransactionId::new();
        let mut scopes = self.scopes.lock()?;
        scopes.insert(id, TransactionScope::new(id));
        Ok(id)
    }

    /// Increment the scope's step counter and return the new step index
    pub fn next_step(&self, id: TransactionId) -> Result<u32> {
        let mut scopes = self.scopes.lock()?;
        let scope = scopes
            .get_mut(&id)
            .ok_or(MockError::UnknownTransaction(id))?;
        scope.next_step()
    }

    /// Close a scope as committed
    pub fn commit(&self, id: TransactionId) -> Result<()> {
        let mut scopes = self.scopes.lock()?;
        let scope = scopes
            .get_mut(&id)
            .ok_or(MockError::UnknownTransaction(id))?;
        scope.commit()
    }

    /// Close a scope as rolled back
    pub fn rollback(&self, id: TransactionId) -> Result<()> {
        let mut scopes = self.scopes.lock()?;
        let scope = scopes
            .get_mut(&id)
            .ok_or(MockError::UnknownTransaction(id))?;
        scope.rollback()
    }

    /// Get the current state of a scope, if it exists
    pub fn state_of(&self, id: TransactionId) -> Result<Option<ScopeState>> {
        let scopes = self.scopes.lock()?;
        Ok(scopes.get(&id).map(|scope| scope.state()))
    }

    /// Number of scopes still accepting steps
    pub fn active_count(&self) -> Result<usize> {
        let scopes = self.scopes.lock()?;
        Ok(scopes.values().filter(|s| s.state().is_active()).count())
    }

    /// Drop all scopes, open or closed
    pub fn clear(&self) -> Result<()> {
        let mut scopes = self.scopes.lock()?;
        scopes.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_and_step() {
        let manager = ScopeManager::new();
        let id = manager.begin().unwrap();

        assert_eq!(manager.next_step(id).unwrap(), 1);
        assert_eq!(manager.next_step(id).unwrap(), 2);
        assert_eq!(manager.next_step(id).unwrap(), 3);
    }

    #[test]
    fn test_scopes_count_independently() {
        let manager = ScopeManager::new();
        let a = manager.begin().unwrap();
        let b = manager.begin().unwrap();

        assert_eq!(manager.next_step(a).unwrap(), 1);
        assert_eq!(manager.next_step(b).unwrap(), 1);
        assert_eq!(manager.next_step(a).unwrap(), 2);
        assert_eq!(manager.next_step(b).unwrap(), 2);
        assert_eq!(manager.next_step(b).unwrap(), 3);
        assert_eq!(manager.next_step(a).unwrap(), 3);
    }

    #[test]
    fn test_unknown_scope_is_an_error() {
        let manager = ScopeManager::new();
        let err = manager.next_step(TransactionId::new()).unwrap_err();
        assert!(matches!(err, MockError::UnknownTransaction(_)));
    }

    #[test]
    fn test_step_after_commit_reports_closed() {
        let manager = ScopeManager::new();
        let id = manager.begin().unwrap();

        manager.next_step(id).unwrap();
        manager.commit(id).unwrap();

        let err = manager.next_step(id).unwrap_err();
        assert!(matches!(err, MockError::ScopeClosed(_)));
        assert_eq!(manager.state_of(id).unwrap(), Some(ScopeState::Committed));
    }

    #[test]
    fn test_double_close_is_an_error() {
        let manager = ScopeManager::new();
        let id = manager.begin().unwrap();

        manager.rollback(id).unwrap();
        assert!(manager.commit(id).is_err());
        assert!(manager.rollback(id).is_err());
    }

    #[test]
    fn test_clear_forgets_everything() {
        let manager = ScopeManager::new();
        let id = manager.begin().unwrap();
        assert_eq!(manager.active_count().unwrap(), 1);

        manager.clear().unwrap();
        assert_eq!(manager.active_count().unwrap(), 0);
        assert!(matches!(
            manager.next_step(id).unwrap_err(),
            MockError::UnknownTransaction(_)
        ));
    }
}
