//! Document Request Handler
//!
//! Per-request pipeline: resolve the descriptor, plan and validate, open a
//! session, execute, close. Nothing touches the network until every input
//! has been validated.

use super::descriptor::ConnectionDescriptor;
use super::engine::{ConnectTimeouts, StoreConnector};
use super::executor::{OperationExecutor, OperationOutcome};
use super::quota::QuotaEstimator;
use super::request::{RequestParams, RequestPlanner};
use super::session::ConnectionProvisioner;
use crate::config::{BridgeConfig, StoreConfig};
use crate::error::Result;
use http::{Method, StatusCode};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// One inbound bridge request
#[derive(Debug, Clone)]
pub struct DocumentRequest {
    pub method: Method,
    /// Connection string from the header or query parameter
    pub descriptor_uri: Option<String>,
    pub params: RequestParams,
}

/// Status and JSON body of a successful request
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentResponse {
    pub status: StatusCode,
    pub body: JsonValue,
}

impl From<OperationOutcome> for DocumentResponse {
    fn from(outcome: OperationOutcome) -> Self {
        let status = if outcome.created() {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        };
        Self {
            status,
            body: outcome.into_json(),
        }
    }
}

/// Bridge between HTTP requests and the document store
#[derive(Clone)]
pub struct DocumentHandler {
    store_config: StoreConfig,
    planner: RequestPlanner,
    provisioner: ConnectionProvisioner,
    executor: OperationExecutor,
}

impl DocumentHandler {
    pub fn new(config: &BridgeConfig, connector: Arc<dyn StoreConnector>) -> Self {
        let timeouts = ConnectTimeouts {
            connect: config.store.connect_timeout(),
            server_selection: config.store.server_selection_timeout(),
        };

        let mut documents = config.documents.clone();
        if !documents.transport_fields.contains(&config.server.descriptor_param) {
            documents
                .transport_fields
                .push(config.server.descriptor_param.clone());
        }

        Self {
            store_config: config.store.clone(),
            planner: RequestPlanner::new(&documents),
            provisioner: ConnectionProvisioner::new(connector, timeouts),
            executor: OperationExecutor::new(
                QuotaEstimator::new(config.quota.ceiling_bytes),
                config.documents.ranking_field.clone(),
            ),
        }
    }

    /// Name of the store engine behind this handler
    pub fn engine_name(&self) -> &'static str {
        self.provisioner.engine_name()
    }

    pub async fn handle(&self, request: DocumentRequest) -> Result<DocumentResponse> {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("document_request", %request_id, method = %request.method);

        async move {
            let descriptor = ConnectionDescriptor::resolve(
                request.descriptor_uri.as_deref(),
                request.params.param("db"),
                request.params.param("col"),
                &self.store_config,
            )?;
            let operation = self.planner.plan(&request.method, &request.params)?;
            let operation_name = operation.name();

            let session = self.provisioner.open(&descriptor).await?;
            let outcome = self.executor.execute(session.store(), operation).await;
            session.close().await;

            let outcome = outcome?;
            info!(
                operation = operation_name,
                endpoint = %descriptor.redacted(),
                database = descriptor.database(),
                collection = descriptor.collection(),
                "request completed"
            );
            Ok(DocumentResponse::from(outcome))
        }
        .instrument(span)
        .await
    }
}
