/// How a nested `begin` numbers the queries that follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SavepointMode {
    /// Savepoint statements keep counting on the enclosing transaction's
    /// step sequence. This matches drivers that model savepoints as plain
    /// statements inside the outer transaction.
    #[default]
    ContinueParent,
    /// Each savepoint opens a child scope whose steps restart at 1.
    IndependentScope,
}

/// Tracker tuning, set up in the builder style:
///
/// ```
/// use querymock::{SavepointMode, Tracker, TrackerConfig};
///
/// let tracker = Tracker::with_config(
///     TrackerConfig::new().savepoint_mode(SavepointMode::IndependentScope),
/// );
/// # let _ = tracker;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub savepoint_mode: SavepointMode,
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self {
            savepoint_mode: SavepointMode::default(),
        }
    }

    pub fn savepoint_mode(mut self, savepoint_mode: SavepointMode) -> Self {
        self.savepoint_mode = savepoint_mode;
        self
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new()
    }
}
