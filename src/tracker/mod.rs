// ============================================================================
// Tracker
// ============================================================================
//
// The test-facing handle. A tracker owns the handler registry, the query log
// and the transaction scope counters, and drives the install lifecycle that
// swaps a client's transport for the mock. Handles are cheap to clone; every
// clone shares the same state.
//
// ============================================================================

pub mod config;
pub mod log;
pub mod registry;

pub use config::{SavepointMode, TrackerConfig};
pub use log::QueryLog;
pub use registry::{HandlerId, QueryHandler};

use crate::core::{MockError, Result};
use crate::record::QueryRecord;
use crate::transaction::ScopeManager;
use crate::transport::mock::MockTransport;
use crate::transport::{Interceptable, Transport};
use registry::HandlerRegistry;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Where a tracker is in its install lifecycle.
enum Lifecycle {
    Idle,
    Installed(InstalledState),
    Uninstalled,
}

struct InstalledState {
    client: Arc<dyn Interceptable>,
    original: Arc<dyn Transport>,
    mock: Arc<dyn Transport>,
}

/// State shared by every clone of a tracker handle and by the mock transport
/// it installs.
pub(crate) struct TrackerShared {
    pub(crate) config: TrackerConfig,
    pub(crate) registry: HandlerRegistry,
    pub(crate) log: QueryLog,
    pub(crate) scopes: ScopeManager,
    lifecycle: Mutex<Lifecycle>,
}

/// Intercepts a client's queries for the duration of a test.
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
///     record.respond_json(serde_json::json!([{"id": 1}])).unwrap();
/// })?;
///
/// let result = client.query(Statement::select("SELECT * FROM users")).await?;
/// assert_eq!(result.row_count(), 1);
///
/// tracker.uninstall(&client)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Tracker {
    pub(crate) shared: Arc<TrackerShared>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::new())
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            shared: Arc::new(TrackerShared {
                config,
                registry: HandlerRegistry::default(),
                log: QueryLog::default(),
                scopes: ScopeManager::default(),
                lifecycle: Mutex::new(Lifecycle::Idle),
            }),
        }
    }

    /// Swap the client's transport for this tracker's mock.
    pub fn install<C>(&self, client: &Arc<C>) -> Result<()>
    where
        C: Interceptable + 'static,
    {
        let mut lifecycle = self.shared.lifecycle.lock()?;
        if let Lifecycle::Installed(_) = &*lifecycle {
            return Err(MockError::AlreadyInstalled);
        }

        let mock: Arc<dyn Transport> = Arc::new(MockTransport::new(Arc::clone(&self.shared)));
        let original = client.replace_transport(Arc::clone(&mock))?;
        *lifecycle = Lifecycle::Installed(InstalledState {
            client: Arc::clone(client) as Arc<dyn Interceptable>,
            original,
            mock,
        });
        info!("mock transport installed");
        Ok(())
    }

    /// Restore the client's original transport and reset the tracker.
    ///
    /// The client must be the one this tracker was installed on. Handlers,
    /// transaction scopes, and the query log are all cleared, so the next
    /// install starts from a blank slate. A query still parked when its
    /// record is discarded here resolves with an error instead of waiting
    /// forever.
    pub fn uninstall<C>(&self, client: &Arc<C>) -> Result<()>
    where
        C: Interceptable + 'static,
    {
        let mut lifecycle = self.shared.lifecycle.lock()?;
        let state = match &*lifecycle {
            Lifecycle::Installed(state) => state,
            _ => return Err(MockError::NotInstalled),
        };

        let same_client =
            Arc::as_ptr(&state.client) as *const () == Arc::as_ptr(client) as *const ();
        if !same_client {
            return Err(MockError::WrongClient);
        }

        let original = Arc::clone(&state.original);
        let mock = Arc::clone(&state.mock);
        let displaced = client.replace_transport(original)?;
        if !Arc::ptr_eq(&displaced, &mock) {
            warn!("transport slot no longer held the installed mock at uninstall");
        }
        *lifecycle = Lifecycle::Uninstalled;

        self.shared.registry.clear()?;
        self.shared.scopes.clear()?;
        self.shared.log.clear()?;
        info!("mock transport uninstalled");
        Ok(())
    }

    pub fn is_installed(&self) -> Result<bool> {
        Ok(matches!(&*self.shared.lifecycle.lock()?, Lifecycle::Installed(_)))
    }

    /// Register a handler for every intercepted query.
    ///
    /// Handlers fire in registration order. The returned ID removes this
    /// registration via [`Tracker::remove_handler`].
    pub fn on_query<F>(&self, handler: F) -> Result<HandlerId>
    where
        F: Fn(Arc<QueryRecord>, u32) + Send + Sync + 'static,
    {
        self.shared.registry.add(Arc::new(handler), false)
    }

    /// Register a handler that fires for the next query only.
    pub fn once_query<F>(&self, handler: F) -> Result<HandlerId>
    where
        F: Fn(Arc<QueryRecord>, u32) + Send + Sync + 'static,
    {
        self.shared.registry.add(Arc::new(handler), true)
    }

    /// Remove one handler registration. Returns whether it was present.
    pub fn remove_handler(&self, id: HandlerId) -> Result<bool> {
        self.shared.registry.remove(id)
    }

    pub fn remove_all_handlers(&self) -> Result<()> {
        self.shared.registry.clear()
    }

    pub fn handler_count(&self) -> Result<usize> {
        self.shared.registry.len()
    }

    /// The log of queries intercepted since the last install.
    pub fn queries(&self) -> &QueryLog {
        &self.shared.log
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.shared.config
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}
