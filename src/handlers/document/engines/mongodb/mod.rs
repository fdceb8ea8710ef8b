//! MongoDB Document Engine
//!
//! Per-request MongoDB connections using the official driver.

pub mod config;
pub mod connection;

pub use config::MongoConnectionOptions;
pub use connection::{MongoConnector, MongoStore};

use crate::handlers::document::diagnosis::{FaultKind, StoreFailure};
use mongodb::error::ErrorKind;

/// MongoDB specific error conversion
pub(crate) fn convert_mongodb_error(err: mongodb::error::Error) -> StoreFailure {
    let message = err.to_string();
    match err.kind.as_ref() {
        ErrorKind::Authentication { .. } => {
            StoreFailure::new(FaultKind::Authentication, "Authentication", message)
        }
        ErrorKind::ServerSelection { .. } => {
            // Selection errors wrap whatever made every server unusable.
            let lowered = message.to_lowercase();
            let kind = if lowered.contains("authentication failed") || lowered.contains("bad auth") {
                FaultKind::Authentication
            } else if lowered.contains("failed to lookup") || lowered.contains("no such host") {
                FaultKind::HostResolution
            } else {
                FaultKind::Timeout
            };
            StoreFailure::new(kind, "ServerSelection", message)
        }
        ErrorKind::DnsResolve { .. } => {
            StoreFailure::new(FaultKind::HostResolution, "DnsResolve", message)
        }
        ErrorKind::InvalidArgument { .. } => {
            StoreFailure::new(FaultKind::MalformedOptions, "InvalidArgument", message)
        }
        ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            StoreFailure::new(FaultKind::Timeout, "Io", message)
        }
        ErrorKind::Io(_) => StoreFailure::other("Io", message),
        ErrorKind::Command(command) => StoreFailure::other(command.code_name.clone(), message),
        ErrorKind::Write(_) => StoreFailure::other("Write", message),
        _ => StoreFailure::other("MongoError", message),
    }
}
