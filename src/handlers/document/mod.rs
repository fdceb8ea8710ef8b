//! Document bridge
//!
//! Stateless HTTP-to-document-store bridge: every request carries its own
//! connection string, gets its own connection and runs one operation.

pub mod descriptor;
pub mod diagnosis;
pub mod engine;
pub mod engines;
pub mod executor;
pub mod handler;
pub mod normalizer;
pub mod quota;
pub mod request;
pub mod session;
pub mod types;

pub use descriptor::ConnectionDescriptor;
pub use diagnosis::{classify, Diagnosis, DiagnosisCode, FaultKind, StoreFailure};
pub use engine::{ConnectTimeouts, DocumentStore, StoreConnector};
pub use executor::{OperationExecutor, OperationOutcome};
pub use handler::{DocumentHandler, DocumentRequest, DocumentResponse};
pub use normalizer::PayloadNormalizer;
pub use quota::QuotaEstimator;
pub use request::{Operation, RequestParams, RequestPlanner};
pub use session::{ConnectionProvisioner, StoreSession};
pub use types::{Document, Identity, OutputMode, QuotaSnapshot, StorageStats};
