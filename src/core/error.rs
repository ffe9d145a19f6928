//! Error handling - construction, configuration and collaborator failures
//!
//! Input problems (invalid text, precision loss, min/amount conflicts,
//! volume adjustments) are never errors: they travel as verdicts and
//! warnings on the fields themselves.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Offer desk error hierarchy
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wallet collaborator errors (address allocation, publishing)
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Misuse of a session (e.g. seeding twice)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// IO errors (reading the config file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
