//! Error types for join-core operations.
//!
//! Service failures never surface as `JoinError` from the controller; they
//! are folded into controller state. `JoinError` is reserved for caller
//! mistakes and environment problems (config, worker lifecycle).

use std::path::PathBuf;

use bambinos_join_protocol::ErrorInfo;

// ═══════════════════════════════════════════════════════════════════════════════
// Service Errors (one join request)
// ═══════════════════════════════════════════════════════════════════════════════

/// Why a single call to the join service produced no usable answer.
///
/// Distinct from a well-formed `ready: false` response, which is not an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Join service unreachable: {0}")]
    Transport(String),

    #[error("Join service returned HTTP {status}")]
    Status { status: u16 },

    #[error("Join service response could not be decoded: {0}")]
    Decode(String),

    #[error("Join service response malformed: {0}")]
    Malformed(String),
}

impl From<ErrorInfo> for ServiceError {
    fn from(info: ErrorInfo) -> Self {
        ServiceError::Malformed(info.to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Crate Errors
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    // ─────────────────────────────────────────────────────────────────────
    // Caller Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Invalid API base URL {url}: {details}")]
    InvalidBaseUrl { url: String, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ─────────────────────────────────────────────────────────────────────
    // Runtime Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Join worker has stopped")]
    WorkerStopped,
}

/// Convenience type alias for Results using JoinError.
pub type Result<T> = std::result::Result<T, JoinError>;
