//! Error types for the PLM gateway

use std::io;

use thiserror::Error;

/// Result type alias for the PLM gateway
pub type Result<T> = std::result::Result<T, Error>;

/// PLM gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tool name not present in the registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Arguments rejected before reaching the backend
    #[error("Invalid arguments: {}", describe_validation(.missing, .mismatched))]
    Validation {
        /// Required fields absent from the call arguments
        missing: Vec<String>,
        /// Fields present but of the wrong primitive type, as `"field (expected <type>)"`
        mismatched: Vec<String>,
    },

    /// Server id not present in the configured profile set
    #[error("Unknown server id: {0}")]
    UnknownServer(u32),

    /// Timeout or network failure on either transport
    #[error("Transport error: {0}")]
    Transport(String),

    /// Explicit JSON-RPC error member - authoritative, never retried
    #[error("Protocol error {code}: {message}")]
    Protocol {
        /// JSON-RPC error code
        code: i32,
        /// Error message
        message: String,
    },

    /// Non-2xx from the OData backend
    #[error("Backend API error ({status}): {message}")]
    BackendApi {
        /// HTTP status returned by the backend
        status: u16,
        /// Human-readable message extracted from the response
        message: String,
        /// Raw response body, when one was present
        body: Option<String>,
    },

    /// CSRF token fetch failed on both the initial attempt and the single retry
    #[error("CSRF token acquisition failed: {0}")]
    CsrfAcquisition(String),

    /// Tool execution failed for a reason with no more specific classification
    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_validation(missing: &[String], mismatched: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing required fields [{}]", missing.join(", ")));
    }
    if !mismatched.is_empty() {
        parts.push(format!("type mismatches [{}]", mismatched.join(", ")));
    }
    parts.join("; ")
}

impl Error {
    /// Create a validation error for missing required fields only
    #[must_use]
    pub fn missing_fields(missing: Vec<String>) -> Self {
        Self::Validation {
            missing,
            mismatched: Vec::new(),
        }
    }

    /// Convert to JSON-RPC error code
    #[must_use]
    pub fn to_rpc_code(&self) -> i32 {
        match self {
            Self::Protocol { code, .. } => *code,
            Self::Json(_) => rpc_codes::PARSE_ERROR,
            Self::ToolNotFound(_) => rpc_codes::METHOD_NOT_FOUND,
            Self::Validation { .. } => rpc_codes::INVALID_PARAMS,
            Self::Transport(_)
            | Self::BackendApi { .. }
            | Self::CsrfAcquisition(_)
            | Self::UnknownServer(_)
            | Self::ExecutionFailed(_) => rpc_codes::SERVER_ERROR_START,
            _ => rpc_codes::INTERNAL_ERROR,
        }
    }
}

/// Standard JSON-RPC error codes
pub mod rpc_codes {
    /// Parse error - Invalid JSON
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - Not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Server error range start
    pub const SERVER_ERROR_START: i32 = -32000;
    /// Server error range end
    pub const SERVER_ERROR_END: i32 = -32099;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_every_missing_field() {
        let err = Error::missing_fields(vec!["DocumentId".to_string(), "Revision".to_string()]);
        let msg = err.to_string();
        assert!(msg.contains("DocumentId"), "message must name DocumentId: {msg}");
        assert!(msg.contains("Revision"), "message must name Revision: {msg}");
    }

    #[test]
    fn validation_error_reports_mismatches_alongside_missing() {
        let err = Error::Validation {
            missing: vec!["Plant".to_string()],
            mismatched: vec!["Quantity (expected number)".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Plant"));
        assert!(msg.contains("Quantity (expected number)"));
    }

    #[test]
    fn rpc_code_mapping() {
        assert_eq!(
            Error::ToolNotFound("x".into()).to_rpc_code(),
            rpc_codes::METHOD_NOT_FOUND
        );
        assert_eq!(
            Error::missing_fields(vec!["a".into()]).to_rpc_code(),
            rpc_codes::INVALID_PARAMS
        );
        assert_eq!(
            Error::Protocol {
                code: -32099,
                message: "boom".into()
            }
            .to_rpc_code(),
            -32099
        );
        assert_eq!(
            Error::Transport("down".into()).to_rpc_code(),
            rpc_codes::SERVER_ERROR_START
        );
    }
}
