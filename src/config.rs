//! Bridge configuration
//!
//! Defaults, optional TOML file and `DOC_BRIDGE__` environment overrides.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    BridgeConfig, DocumentConfig, LogFormat, LoggingConfig, QuotaConfig, ServerConfig,
    StoreConfig,
};

impl BridgeConfig {
    /// Reject settings the handlers cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        use crate::handlers::document::normalizer::CONTROL_PARAMS;
        use crate::Error;

        if self.store.connect_timeout_ms == 0 || self.store.server_selection_timeout_ms == 0 {
            return Err(Error::Config(
                "store timeouts must be greater than zero".to_string(),
            ));
        }
        if self.store.default_database.is_empty() || self.store.default_collection.is_empty() {
            return Err(Error::Config(
                "default database and collection cannot be empty".to_string(),
            ));
        }
        if self.quota.ceiling_bytes == 0 {
            return Err(Error::Config(
                "quota ceiling must be greater than zero".to_string(),
            ));
        }
        if self.documents.default_limit == 0
            || self.documents.default_limit > self.documents.max_limit
        {
            return Err(Error::Config(format!(
                "default_limit must be between 1 and max_limit ({})",
                self.documents.max_limit
            )));
        }
        if self.documents.identity_field.is_empty() || self.documents.reset_token.is_empty() {
            return Err(Error::Config(
                "identity_field and reset_token cannot be empty".to_string(),
            ));
        }
        let identity = self.documents.identity_field.as_str();
        if self.documents.transport_fields.iter().any(|f| f == identity)
            || CONTROL_PARAMS.contains(&identity)
        {
            return Err(Error::Config(format!(
                "identity field '{}' cannot be a transport field",
                self.documents.identity_field
            )));
        }
        // The connection string must never be stored as a document field.
        if !self
            .documents
            .transport_fields
            .contains(&self.server.descriptor_param)
        {
            return Err(Error::Config(format!(
                "descriptor parameter '{}' must be listed in transport_fields",
                self.server.descriptor_param
            )));
        }
        Ok(())
    }
}
