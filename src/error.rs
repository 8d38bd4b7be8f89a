//! Error types for the credit agent orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Routing error: {0}")]
    RoutingError(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Agent reply could not be parsed: {0}")]
    AgentReplyError(String),

    #[error("Verification error: {0}")]
    VerificationError(String),

    #[error("Bureau error: {0}")]
    BureauError(String),

    #[error("Offer error: {0}")]
    OfferError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
