//! Custom error types for the mosque times application
//!
//! This module defines custom error types and implements the necessary traits
//! to properly handle errors throughout the application.

use std::fmt;

/// Main error type for the mosque times application
#[derive(Debug)]
pub enum MosqueTimesError {
    /// Error occurred while parsing address
    AddressParse(std::net::AddrParseError),

    /// Error occurred while reading or writing a file or socket
    Io(std::io::Error),

    /// Error occurred while parsing configuration
    ConfigParse(json5::Error),

    /// Error occurred while encoding or decoding JSON
    Json(serde_json::Error),

    /// Error occurred while talking to the prayer times feed
    Http(reqwest::Error),

    /// A feed URL could not be built
    InvalidUrl(url::ParseError),

    /// The feed answered with a non-success status code
    FetchStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Error occurred while persisting a preference
    Storage(String),

    /// Generic error with a message
    Generic(String),
}

impl fmt::Display for MosqueTimesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MosqueTimesError::AddressParse(e) => {
                write!(f, "Failed to parse network address: {e}")
            }
            MosqueTimesError::Io(e) => {
                write!(f, "I/O error: {e}")
            }
            MosqueTimesError::ConfigParse(e) => {
                write!(f, "Failed to parse configuration: {e}")
            }
            MosqueTimesError::Json(e) => {
                write!(f, "Invalid JSON: {e}")
            }
            MosqueTimesError::Http(e) => {
                write!(f, "Feed request failed: {e}")
            }
            MosqueTimesError::InvalidUrl(e) => {
                write!(f, "Invalid feed URL: {e}")
            }
            MosqueTimesError::FetchStatus { url, status } => {
                write!(f, "Feed responded with {status} for {url}")
            }
            MosqueTimesError::Storage(msg) => {
                write!(f, "Storage error: {msg}")
            }
            MosqueTimesError::Generic(msg) => {
                write!(f, "Error: {msg}")
            }
        }
    }
}

impl std::error::Error for MosqueTimesError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MosqueTimesError::AddressParse(e) => Some(e),
            MosqueTimesError::Io(e) => Some(e),
            MosqueTimesError::ConfigParse(e) => Some(e),
            MosqueTimesError::Json(e) => Some(e),
            MosqueTimesError::Http(e) => Some(e),
            MosqueTimesError::InvalidUrl(e) => Some(e),
            MosqueTimesError::FetchStatus { .. }
            | MosqueTimesError::Storage(_)
            | MosqueTimesError::Generic(_) => None,
        }
    }
}

impl From<std::net::AddrParseError> for MosqueTimesError {
    fn from(error: std::net::AddrParseError) -> Self {
        MosqueTimesError::AddressParse(error)
    }
}

impl From<std::io::Error> for MosqueTimesError {
    fn from(error: std::io::Error) -> Self {
        MosqueTimesError::Io(error)
    }
}

impl From<json5::Error> for MosqueTimesError {
    fn from(error: json5::Error) -> Self {
        MosqueTimesError::ConfigParse(error)
    }
}

impl From<serde_json::Error> for MosqueTimesError {
    fn from(error: serde_json::Error) -> Self {
        MosqueTimesError::Json(error)
    }
}

impl From<reqwest::Error> for MosqueTimesError {
    fn from(error: reqwest::Error) -> Self {
        MosqueTimesError::Http(error)
    }
}

impl From<url::ParseError> for MosqueTimesError {
    fn from(error: url::ParseError) -> Self {
        MosqueTimesError::InvalidUrl(error)
    }
}

impl From<&str> for MosqueTimesError {
    fn from(msg: &str) -> Self {
        MosqueTimesError::Generic(msg.to_string())
    }
}

impl From<String> for MosqueTimesError {
    fn from(msg: String) -> Self {
        MosqueTimesError::Generic(msg)
    }
}

/// Result type alias using our custom error type
pub type Result<T> = std::result::Result<T, MosqueTimesError>;
