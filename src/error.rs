//! Error types for the NuoDB wire protocol engine.

use std::io;

use thiserror::Error;

use crate::protocol;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the driver.
///
/// Only `Database` leaves the connection usable; every other variant marks
/// the connection broken and further operations fail with `Interface`.
#[derive(Error, Debug)]
pub enum Error {
    /// API misuse: closed cursor, wrong parameter count, unsupported type.
    #[error("interface error: {0}")]
    Interface(String),

    /// Socket-level failure, partial frame, or EOF mid-frame.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// Session keys disagreed or the server rejected the credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// A tag, length, or opcode that violates the wire format.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server returned a non-zero code in the standard error frame.
    #[error("database error {code} ({}): {message}", protocol::error_name(*.code))]
    Database {
        code: i32,
        message: String,
        sqlstate: String,
    },

    /// A value could not be marshalled or unmarshalled losslessly.
    #[error("data error: {0}")]
    Data(String),

    /// I/O timed out; the connection has been closed.
    #[error("operation timed out")]
    Timeout,
}

impl Error {
    /// True if the connection survives this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Database { .. })
    }

    /// SQLSTATE of a server error, if any.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Database { sqlstate, .. } if !sqlstate.is_empty() => Some(sqlstate),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::ConnectionLost(e.to_string())
    }
}
