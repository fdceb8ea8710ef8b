//! Connection Descriptor
//!
//! Caller-supplied endpoint plus target database and collection. Validation
//! here is purely syntactic and happens before any network activity.

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use std::fmt;

/// URI prefixes the store accepts
pub const RECOGNIZED_SCHEMES: &[&str] = &["mongodb://", "mongodb+srv://"];

/// Characters MongoDB forbids in database names
const FORBIDDEN_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$'];

/// Per-request connection target
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    uri: String,
    database: String,
    collection: String,
}

impl ConnectionDescriptor {
    /// Build a descriptor from request inputs, falling back to configured
    /// database and collection names.
    pub fn resolve(
        uri: Option<&str>,
        database: Option<&str>,
        collection: Option<&str>,
        defaults: &StoreConfig,
    ) -> Result<Self> {
        let uri = uri.map(str::trim).filter(|u| !u.is_empty()).ok_or_else(|| {
            Error::Validation("missing connection string (x-mongodb-uri header or mongoUri parameter)".to_string())
        })?;

        if !RECOGNIZED_SCHEMES.iter().any(|scheme| uri.starts_with(scheme)) {
            return Err(Error::Validation(format!(
                "connection string must start with one of: {}",
                RECOGNIZED_SCHEMES.join(", ")
            )));
        }
        if uri.len() == scheme_len(uri) {
            return Err(Error::Validation(
                "connection string has no host".to_string(),
            ));
        }

        let database = non_empty(database).unwrap_or(&defaults.default_database);
        let collection = non_empty(collection).unwrap_or(&defaults.default_collection);
        validate_database_name(database)?;
        validate_collection_name(collection)?;

        Ok(Self {
            uri: uri.to_string(),
            database: database.to_string(),
            collection: collection.to_string(),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Endpoint with credentials removed, safe for logs
    pub fn redacted(&self) -> String {
        let start = scheme_len(&self.uri);
        let rest = &self.uri[start..];
        let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
        match rest[..authority_end].rfind('@') {
            Some(at) => format!("{}***@{}", &self.uri[..start], &rest[at + 1..]),
            None => self.uri.clone(),
        }
    }
}

// Never print the raw connection string.
impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("uri", &self.redacted())
            .field("database", &self.database)
            .field("collection", &self.collection)
            .finish()
    }
}

fn scheme_len(uri: &str) -> usize {
    RECOGNIZED_SCHEMES
        .iter()
        .find(|scheme| uri.starts_with(*scheme))
        .map(|scheme| scheme.len())
        .unwrap_or(0)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn validate_database_name(name: &str) -> Result<()> {
    if name.contains(FORBIDDEN_DATABASE_CHARS) || name.contains('\0') {
        return Err(Error::Validation(format!(
            "invalid database name '{}'",
            name
        )));
    }
    Ok(())
}

fn validate_collection_name(name: &str) -> Result<()> {
    if name.contains('$') || name.contains('\0') || name.starts_with("system.") {
        return Err(Error::Validation(format!(
            "invalid collection name '{}'",
            name
        )));
    }
    Ok(())
}
