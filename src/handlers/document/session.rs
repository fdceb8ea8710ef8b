//! Connection Provisioner
//!
//! One short-lived connection per request. The open sequence is bounded by
//! the configured timeouts and a [`StoreSession`] always releases its
//! connection: explicitly through [`StoreSession::close`], or from `Drop`
//! when the request exits early or panics.

use super::descriptor::ConnectionDescriptor;
use super::engine::{ConnectTimeouts, DocumentStore, StoreConnector};
use super::diagnosis::StoreFailure;
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Opens per-request sessions through a store connector
#[derive(Clone)]
pub struct ConnectionProvisioner {
    connector: Arc<dyn StoreConnector>,
    timeouts: ConnectTimeouts,
}

impl ConnectionProvisioner {
    pub fn new(connector: Arc<dyn StoreConnector>, timeouts: ConnectTimeouts) -> Self {
        Self {
            connector,
            timeouts,
        }
    }

    pub fn engine_name(&self) -> &'static str {
        self.connector.engine_name()
    }

    /// Open a session, failing with `Error::Connection` when the endpoint is
    /// unreachable or the bound elapses.
    pub async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<StoreSession> {
        let start = Instant::now();
        let bound = self.timeouts.total();

        // Dropping the connect future on timeout drops any half-built client.
        let connected =
            tokio::time::timeout(bound, self.connector.connect(descriptor, &self.timeouts)).await;

        match connected {
            Ok(Ok(store)) => {
                debug!(
                    engine = self.connector.engine_name(),
                    endpoint = %descriptor.redacted(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "store session opened"
                );
                Ok(StoreSession::new(store))
            }
            Ok(Err(failure)) => {
                warn!(
                    endpoint = %descriptor.redacted(),
                    error = %failure,
                    "store connection failed"
                );
                Err(Error::Connection(failure))
            }
            Err(_) => {
                warn!(
                    endpoint = %descriptor.redacted(),
                    bound_ms = bound.as_millis() as u64,
                    "store connection timed out"
                );
                Err(Error::Connection(StoreFailure::timed_out(format!(
                    "connection not established within {}ms timeout",
                    bound.as_millis()
                ))))
            }
        }
    }
}

/// A live connection scoped to one request
pub struct StoreSession {
    store: Option<Box<dyn DocumentStore>>,
}

impl StoreSession {
    fn new(store: Box<dyn DocumentStore>) -> Self {
        Self { store: Some(store) }
    }

    /// The connection's store operations
    pub fn store(&self) -> &dyn DocumentStore {
        self.store
            .as_deref()
            .expect("store is present until the session is closed")
    }

    /// Release the connection and wait for it to close
    pub async fn close(mut self) {
        if let Some(store) = self.store.take() {
            store.close().await;
            debug!("store session closed");
        }
    }
}

impl Drop for StoreSession {
    fn drop(&mut self) {
        if let Some(store) = self.store.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    debug!("store session released by drop guard");
                    handle.spawn(store.close());
                }
                // Without a runtime the connection is dropped in place.
                Err(_) => drop(store),
            }
        }
    }
}
