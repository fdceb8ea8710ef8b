use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Store connection configuration
    pub store: StoreConfig,

    /// Document handling rules
    pub documents: DocumentConfig,

    /// Quota assumptions
    pub quota: QuotaConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub bind_addr: String,

    /// Header carrying the connection string
    pub descriptor_header: String,

    /// Query parameter carrying the connection string
    pub descriptor_param: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            descriptor_header: "x-mongodb-uri".to_string(),
            descriptor_param: "mongoUri".to_string(),
        }
    }
}

/// Store connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Server selection timeout in milliseconds
    pub server_selection_timeout_ms: u64,

    /// Database used when the request names none
    pub default_database: String,

    /// Collection used when the request names none
    pub default_collection: String,

    /// Application name reported to the server
    pub app_name: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            server_selection_timeout_ms: 5_000,
            default_database: "test".to_string(),
            default_collection: "UserData".to_string(),
            app_name: Some("doc-bridge".to_string()),
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }
}

/// Document handling rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Identity key carried by every record
    pub identity_field: String,

    /// Field ranking read-many results (descending)
    pub ranking_field: String,

    /// Identity value that confirms a full collection reset
    pub reset_token: String,

    /// Page size when the request gives none
    pub default_limit: u32,

    /// Upper bound for any requested page size
    pub max_limit: u32,

    /// Request parameters that never become document fields
    pub transport_fields: Vec<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            identity_field: "userId".to_string(),
            ranking_field: "points".to_string(),
            reset_token: "ALL_DATA_RESET_CONFIRM".to_string(),
            default_limit: 100,
            max_limit: 500,
            transport_fields: [
                "mongoUri", "view", "limit", "db", "col", "action", "field", "amount", "id",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Quota assumptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Assumed storage ceiling in bytes
    pub ceiling_bytes: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        // 512 MiB shared-tier limit
        Self {
            ceiling_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directive
    pub level: String,

    /// Output format
    pub format: LogFormat,

    /// Directory for rolling log files; console only when unset
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Human,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Human,
}
