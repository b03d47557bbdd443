//! Error types for cartbot.
//!
//! Taxonomy:
//! - User-facing: the collaborator rejected the request for a reason the user can act on
//! - Configuration: settings that cannot be used to build the clients
//! - Collaborator faults: network, non-success status, malformed payload
//!
//! Interpreter faults have their own type ([`InterpretError`]) because they never
//! escape the adapter: every one of them is downgraded to an `Unknown` intent.

use thiserror::Error;

/// Generic text shown to end users when a collaborator fault occurs.
pub const RETRYABLE_FAILURE_TEXT: &str =
    "Tuve un problema consultando la tienda. Intenta de nuevo en unos segundos.";

/// Top-level error type for catalog and cart operations.
#[derive(Debug, Error)]
pub enum CartbotError {
    // ═══════════════════════════════════════════════════════════════════
    // USER-FACING: reported by the collaborator, meaningful to the user
    // ═══════════════════════════════════════════════════════════════════
    #[error("Cart rejected: {0}")]
    CartRejected(String),

    // ═══════════════════════════════════════════════════════════════════
    // CONFIGURATION: raised while building clients, never at dispatch time
    // ═══════════════════════════════════════════════════════════════════
    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    // ═══════════════════════════════════════════════════════════════════
    // COLLABORATOR FAULTS: network and protocol failures
    // ═══════════════════════════════════════════════════════════════════

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CartbotError {
    /// Text that may be shown to the end user for this error.
    ///
    /// Only collaborator-reported rejections are passed through verbatim;
    /// everything else collapses to a generic retryable message.
    pub fn user_message(&self) -> String {
        match self {
            Self::CartRejected(reason) => {
                format!("No pude completar el carrito: {reason}.")
            }
            _ => RETRYABLE_FAILURE_TEXT.to_string(),
        }
    }

    /// Check if this error is worth retrying by the user.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Api { .. } | Self::InvalidResponse(_))
    }
}

/// Failure modes of the interpreter collaborator.
///
/// Each variant maps to a distinct diagnostic message on the fallback intent.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("{0}")]
    Transport(String),

    #[error("{body}")]
    Status { status: u16, body: String },

    #[error("Respuesta no es una respuesta estructurada: {0}")]
    NotStructured(String),

    #[error("El contenido no se pudo interpretar como intención: {0}")]
    NotIntent(String),
}

/// Result type alias for cartbot.
pub type Result<T> = std::result::Result<T, CartbotError>;
