/// Unified error type for the membank service.
#[derive(Debug, thiserror::Error)]
pub enum MemBankError {
    #[error("Session not bound: {0}")]
    SessionUnbound(String),

    #[error("Session mismatch: {0}")]
    SessionMismatch(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MemBankError {
    /// True for errors the caller can recover from by fixing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::SessionUnbound(_)
                | Self::SessionMismatch(_)
                | Self::InvalidArgument(_)
                | Self::NotFound(_)
                | Self::Conflict(_)
        )
    }
}
