//! Typed errors for the Flight SQL adapter.
//!
//! The remote server's message text is carried through unmodified — the UI
//! shows it to the user as-is, so nothing here rewrites or summarizes it.

use std::fmt;

/// Errors that can occur while talking to a Flight SQL server.
#[derive(Debug)]
pub enum ClientError {
    /// Failed to establish the channel or authenticate.
    Connect(String),
    /// A statement or metadata request failed on the server.
    Query(String),
    /// The server's response could not be decoded.
    Decode(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Connect(msg) => write!(f, "connection failed: {}", msg),
            ClientError::Query(msg) => write!(f, "query failed: {}", msg),
            ClientError::Decode(msg) => write!(f, "decode failed: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<tonic::transport::Error> for ClientError {
    fn from(e: tonic::transport::Error) -> Self {
        ClientError::Connect(e.to_string())
    }
}

impl From<arrow::error::ArrowError> for ClientError {
    fn from(e: arrow::error::ArrowError) -> Self {
        ClientError::Query(e.to_string())
    }
}

impl From<arrow_flight::error::FlightError> for ClientError {
    fn from(e: arrow_flight::error::FlightError) -> Self {
        ClientError::Query(e.to_string())
    }
}
