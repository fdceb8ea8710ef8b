//! # doc-bridge
//!
//! Stateless HTTP bridge to a document store. Each request carries its own
//! connection string, gets a dedicated short-lived connection and runs a
//! single operation: read-one, ranked read-many, field-level upsert, atomic
//! increment, delete-one or confirmed delete-all. Read-many responses can be
//! enriched with a storage quota estimate, and store failures are returned
//! with a structured diagnosis.

pub mod config;
pub mod error;
pub mod handlers;
pub mod http_server;
pub mod logging;

pub use error::{Error, Result};
pub use handlers::document::DocumentHandler;
pub use http_server::HttpBridgeServer;
