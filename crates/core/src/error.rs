//! Error types for the PairAdmin domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context defines its own error enum in its own crate;
//! this top-level type carries them across crate boundaries as strings
//! so `pairadmin-core` stays dependency-free of the other crates.

use thiserror::Error;

/// The top-level error type for PairAdmin operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Security policy errors ---
    #[error("Policy error: {0}")]
    Policy(String),

    // --- Audit log errors ---
    #[error("Audit error: {0}")]
    Audit(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;
