/// Errors raised by a browser capability.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    // ============================================================
    // Availability
    // ============================================================
    /// The automation runtime cannot be used at all (no browser binary,
    /// launch refused). Operator-actionable, never retried.
    #[error("Browser automation unavailable: {0}")]
    Unavailable(String),

    #[error("Not ready")]
    NotReady,

    // ============================================================
    // Page Errors
    // ============================================================
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("No element matches selector: {selector}")]
    ElementNotFound { selector: String },

    #[error("Invalid selector: {selector}")]
    SelectorInvalid { selector: String },

    #[error("Script execution error: {0}")]
    ScriptError(String),

    #[error("Timeout: {operation} after {after_ms} ms")]
    Timeout { operation: String, after_ms: u64 },

    // ============================================================
    // Session Errors
    // ============================================================
    #[error("Session artifact unusable: {0}")]
    Session(String),

    // ============================================================
    // System Errors
    // ============================================================
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Other: {0}")]
    Other(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization(err.to_string())
    }
}

impl BackendError {
    pub fn timeout(operation: impl Into<String>, after_ms: u64) -> Self {
        BackendError::Timeout {
            operation: operation.into(),
            after_ms,
        }
    }
}
