//! Failure Diagnosis
//!
//! Maps store failures onto a fixed diagnosis vocabulary with a remedy hint.
//!
//! Engines translate their native errors into a [`StoreFailure`] carrying a
//! structured [`FaultKind`] where they can tell what went wrong. The
//! classifier walks an ordered rule table (first match wins); each rule
//! matches either the structured kind or, as a fallback for faults the engine
//! could not categorize, well-known fragments of the failure text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Low-level fault category reported by a store engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Credentials were rejected by the server
    Authentication,
    /// Connect or server selection did not finish in time
    Timeout,
    /// Hostname in the descriptor could not be resolved
    HostResolution,
    /// Connection string options could not be parsed
    MalformedOptions,
    /// Anything the engine could not categorize
    Other,
}

/// A failure reported by a store engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{name}: {message}")]
pub struct StoreFailure {
    /// Structured fault category
    pub kind: FaultKind,
    /// Short error type name (e.g. "ServerSelection")
    pub name: String,
    /// Raw message from the underlying driver
    pub message: String,
}

impl StoreFailure {
    pub fn new(kind: FaultKind, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Failure for an uncategorized engine error
    pub fn other(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FaultKind::Other, name, message)
    }

    /// Failure produced when the provisioning bound elapses
    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Timeout, "ConnectTimeout", message)
    }
}

/// Diagnosis vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisCode {
    CredentialMismatch,
    UnreachableServer,
    WrongHost,
    MalformedOptions,
    Unclassified,
}

impl DiagnosisCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosisCode::CredentialMismatch => "credential_mismatch",
            DiagnosisCode::UnreachableServer => "unreachable_server",
            DiagnosisCode::WrongHost => "wrong_host",
            DiagnosisCode::MalformedOptions => "malformed_options",
            DiagnosisCode::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for DiagnosisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured classification of a failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub code: DiagnosisCode,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remedy: Option<String>,
    /// Raw failure message, never rewritten
    pub detail: String,
}

struct Rule {
    code: DiagnosisCode,
    kind: FaultKind,
    signals: &'static [&'static str],
    summary: &'static str,
    remedy: &'static str,
}

impl Rule {
    fn matches(&self, failure: &StoreFailure, haystack: &str) -> bool {
        failure.kind == self.kind || self.signals.iter().any(|s| haystack.contains(s))
    }
}

// Order matters: an authentication signal wins over everything else.
const RULES: &[Rule] = &[
    Rule {
        code: DiagnosisCode::CredentialMismatch,
        kind: FaultKind::Authentication,
        signals: &["bad auth", "authentication failed", "auth failed"],
        summary: "Username or password in the connection string was rejected.",
        remedy: "Verify the username and password in the connection string.",
    },
    Rule {
        code: DiagnosisCode::UnreachableServer,
        kind: FaultKind::Timeout,
        signals: &["timeout", "timed out", "etimeout"],
        summary: "The server could not be reached before the connection timeout.",
        remedy: "Check the network access list; the server likely needs an open access rule (e.g. 0.0.0.0/0).",
    },
    Rule {
        code: DiagnosisCode::WrongHost,
        kind: FaultKind::HostResolution,
        signals: &["enotfound", "failed to lookup", "no such host", "name or service not known"],
        summary: "The cluster hostname could not be resolved.",
        remedy: "Verify the hostname portion of the connection string.",
    },
    Rule {
        code: DiagnosisCode::MalformedOptions,
        kind: FaultKind::MalformedOptions,
        signals: &["is not a valid", "invalid option", "unrecognized option", "invalid uri"],
        summary: "The connection string contains malformed options or characters.",
        remedy: "Check the trailing URL options of the connection string.",
    },
];

/// Classify a failure. Never fails; the raw message is always preserved.
pub fn classify(failure: &StoreFailure) -> Diagnosis {
    let haystack = format!("{} {}", failure.name, failure.message).to_lowercase();

    match RULES.iter().find(|rule| rule.matches(failure, &haystack)) {
        Some(rule) => Diagnosis {
            code: rule.code,
            summary: rule.summary.to_string(),
            remedy: Some(rule.remedy.to_string()),
            detail: failure.message.clone(),
        },
        None => Diagnosis {
            code: DiagnosisCode::Unclassified,
            summary: "Unknown system error.".to_string(),
            remedy: None,
            detail: failure.message.clone(),
        },
    }
}
