//! Error types for the DDNS system
//!
//! The variants follow the recovery granularity of the reconciliation loop:
//! configuration errors are fatal, observer errors skip a cycle, lookup and
//! write errors are isolated to a single name, and unexpected errors are
//! caught by the scheduler.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Required setting missing or invalid at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// The external address could not be determined
    #[error("Address observer error: {0}")]
    Observer(String),

    /// Reading the current record for a name failed
    #[error("Lookup failed for {name}: {message}")]
    Lookup {
        /// Managed name the lookup was for
        name: String,
        /// Underlying cause
        message: String,
    },

    /// Upserting the record for a name failed
    #[error("Write failed for {name}: {message}")]
    Write {
        /// Managed name the write was for
        name: String,
        /// Underlying cause
        message: String,
    },

    /// Invalid input (malformed name or address)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Anything not covered above; caught at the scheduler boundary
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an address observer error
    pub fn observer(msg: impl Into<String>) -> Self {
        Self::Observer(msg.into())
    }

    /// Create a lookup error for a name
    pub fn lookup(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Lookup {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a write error for a name
    pub fn write(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an unexpected error
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Whether this error is fatal at startup
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Unexpected(format!("{:#}", err))
    }
}
