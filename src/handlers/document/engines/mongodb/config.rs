//! MongoDB Configuration
//!
//! Client options applied to every per-request connection

use crate::config::StoreConfig;
use crate::handlers::document::engine::ConnectTimeouts;
use mongodb::options::ClientOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// MongoDB client options for short-lived connections
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoConnectionOptions {
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Maximum connection idle time
    pub max_idle_time: Option<Duration>,
    /// Application name reported to the server
    pub app_name: Option<String>,
}

impl MongoConnectionOptions {
    pub fn from_store_config(config: &StoreConfig) -> Self {
        Self {
            app_name: config.app_name.clone(),
            ..Self::default()
        }
    }

    /// Overlay these options and the timeouts onto parsed URI options.
    /// Timeouts always win over values given in the URI.
    pub fn apply(&self, options: &mut ClientOptions, timeouts: &ConnectTimeouts) {
        options.max_pool_size = Some(self.max_pool_size);
        options.min_pool_size = Some(self.min_pool_size);
        options.max_idle_time = self.max_idle_time;
        options.connect_timeout = Some(timeouts.connect);
        options.server_selection_timeout = Some(timeouts.server_selection);

        if let Some(ref app_name) = self.app_name {
            options.app_name = Some(app_name.clone());
        }
    }
}

impl Default for MongoConnectionOptions {
    fn default() -> Self {
        // one request, one connection
        Self {
            max_pool_size: 1,
            min_pool_size: 0,
            max_idle_time: None,
            app_name: Some("doc-bridge".to_string()),
        }
    }
}
