//! HTTP Server for the document bridge
//!
//! Routes `/api` and `/api/v1` to the [`DocumentHandler`], answers CORS
//! preflights and exposes a `/health` probe.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Router,
};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::handlers::document::{DocumentHandler, DocumentRequest, RequestParams};
use crate::handlers::document::types::Document;

struct BridgeState {
    handler: DocumentHandler,
    descriptor_header: HeaderName,
    descriptor_param: String,
}

pub struct HttpBridgeServer {
    state: Arc<BridgeState>,
}

impl HttpBridgeServer {
    pub fn new(config: &ServerConfig, handler: DocumentHandler) -> Result<Self> {
        let descriptor_header = HeaderName::from_bytes(config.descriptor_header.as_bytes())
            .map_err(|e| {
                Error::Config(format!(
                    "invalid descriptor header '{}': {}",
                    config.descriptor_header, e
                ))
            })?;

        Ok(Self {
            state: Arc::new(BridgeState {
                handler,
                descriptor_header,
                descriptor_param: config.descriptor_param.clone(),
            }),
        })
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, self.state.descriptor_header.clone()]);

        Router::new()
            .route("/api", any(handle_document))
            .route("/api/v1", any(handle_document))
            .route("/health", get(health).fallback(method_not_allowed))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    pub async fn serve(&self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            addr = %listener.local_addr()?,
            engine = self.state.handler.engine_name(),
            "document bridge listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("document bridge stopped");
        Ok(())
    }
}

async fn handle_document(
    State(state): State<Arc<BridgeState>>,
    method: Method,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
    body: Bytes,
) -> Response {
    // Bare OPTIONS without preflight headers is acknowledged and ignored.
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    let body = match parse_body(&body) {
        Ok(body) => body,
        Err(e) => return e.into_response(),
    };

    let descriptor_uri = headers
        .get(&state.descriptor_header)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string);
    let params = RequestParams::new(query, body);
    let descriptor_uri =
        descriptor_uri.or_else(|| params.param(&state.descriptor_param).map(str::to_string));

    let request = DocumentRequest {
        method,
        descriptor_uri,
        params,
    };

    match state.handler.handle(request).await {
        Ok(response) => (response.status, Json(response.body)).into_response(),
        Err(e) => {
            match e.status_code() {
                StatusCode::INTERNAL_SERVER_ERROR => error!(error = %e, "request failed"),
                _ => warn!(error = %e, "request rejected"),
            }
            e.into_response()
        }
    }
}

/// Empty bodies are absent; anything else must be a JSON object
fn parse_body(raw: &[u8]) -> Result<Option<Document>> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    match serde_json::from_slice::<JsonValue>(raw) {
        Ok(JsonValue::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(Error::Validation(
            "request body must be a JSON object".to_string(),
        )),
        Err(e) => Err(Error::Validation(format!("malformed JSON body: {}", e))),
    }
}

async fn health(State(state): State<Arc<BridgeState>>) -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "engine": state.handler.engine_name(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn method_not_allowed(method: Method) -> Response {
    Error::MethodNotAllowed(method.to_string()).into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
