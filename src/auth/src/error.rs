//! Error types for role resolution and ACL containers

use thiserror::Error;

/// Authorization layer errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Operation name not part of the declared ACL operation set
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Invalid input
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Role is not registered in the container
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Action is not registered in the container
    #[error("Unable to verify unknown action: {0}")]
    UnknownAction(String),

    /// A second memory provider was attached to a container
    #[error("Unable to attach multiple memory providers to ACL container: {0}")]
    ProviderAlreadyAttached(String),

    /// Persisted ACL snapshot could not be encoded or decoded
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Memory provider failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthError>;
