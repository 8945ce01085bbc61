use std::fmt;
use thiserror::Error;

/// The base error type for all Slotkeeper errors.
///
/// This enum provides a common set of error variants that can be used across all crates.
/// Each crate can extend this by implementing From<SpecificError> for SlotkeeperError.
#[derive(Error, Debug)]
pub enum SlotkeeperError {
    /// Error occurred during an HTTP request
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error occurred during database operation
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Error occurred during external service call
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    /// The requested slot is already taken
    #[error("Conflict: {0}")]
    ConflictError(String),

    /// Error occurred due to a resource not being found
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// The caller gave up (deadline or disconnect) before the operation finished
    #[error("Cancelled: {0}")]
    CancelledError(String),

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for SlotkeeperError {
    fn status_code(&self) -> u16 {
        match self {
            SlotkeeperError::HttpError(_) => 500,
            SlotkeeperError::ParseError(_) => 400,
            SlotkeeperError::ConfigError(_) => 500,
            SlotkeeperError::ValidationError(_) => 400,
            SlotkeeperError::DatabaseError(_) => 500,
            SlotkeeperError::ExternalServiceError { .. } => 502,
            SlotkeeperError::ConflictError(_) => 409,
            SlotkeeperError::NotFoundError(_) => 404,
            SlotkeeperError::CancelledError(_) => 504,
            SlotkeeperError::InternalError(_) => 500,
        }
    }
}

/// A trait for adding context to errors.
pub trait Context<T, E> {
    /// Adds context to an error.
    fn context<C>(self, context: C) -> Result<T, SlotkeeperError>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Adds context to an error with a lazy context provider.
    fn with_context<C, F>(self, f: F) -> Result<T, SlotkeeperError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, SlotkeeperError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| SlotkeeperError::InternalError(format!("{}: {}", context, error)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, SlotkeeperError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|error| SlotkeeperError::InternalError(format!("{}: {}", f(), error)))
    }
}

/// Failure of a single outbound HTTP call after the retry policy gave up.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("request cancelled")]
    Cancelled,
}

/// Errors reported by a calendar gateway.
///
/// `NotFound` is kept apart so callers can treat a vanished appointment as a no-op.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("calendar entry not found: {0}")]
    NotFound(String),
    #[error("calendar returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("calendar request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("failed to decode calendar response: {0}")]
    Decode(String),
    #[error("calendar authentication failed: {0}")]
    Auth(String),
    #[error("calendar request cancelled")]
    Cancelled,
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Request(e) => GatewayError::Transport(e),
            TransportError::Cancelled => GatewayError::Cancelled,
        }
    }
}

/// Errors reported by an appointment metadata store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt metadata for {id}: {message}")]
    Corrupt { id: String, message: String },
}

/// Errors reported by a notification sink.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(#[from] TransportError),
    #[error("notification rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),
}

// Common error conversions
impl From<reqwest::Error> for SlotkeeperError {
    fn from(err: reqwest::Error) -> Self {
        SlotkeeperError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for SlotkeeperError {
    fn from(err: serde_json::Error) -> Self {
        SlotkeeperError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for SlotkeeperError {
    fn from(err: std::io::Error) -> Self {
        SlotkeeperError::InternalError(err.to_string())
    }
}

impl From<GatewayError> for SlotkeeperError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotFound(id) => SlotkeeperError::NotFoundError(id),
            GatewayError::Cancelled => {
                SlotkeeperError::CancelledError("calendar request cancelled".to_string())
            }
            other => external_service_error("calendar", other),
        }
    }
}

impl From<StoreError> for SlotkeeperError {
    fn from(err: StoreError) -> Self {
        SlotkeeperError::DatabaseError(err.to_string())
    }
}

// Utility functions for error handling
pub fn config_error<T: fmt::Display>(message: T) -> SlotkeeperError {
    SlotkeeperError::ConfigError(message.to_string())
}

pub fn validation_error<T: fmt::Display>(message: T) -> SlotkeeperError {
    SlotkeeperError::ValidationError(message.to_string())
}

pub fn not_found<T: fmt::Display>(message: T) -> SlotkeeperError {
    SlotkeeperError::NotFoundError(message.to_string())
}

pub fn conflict<T: fmt::Display>(message: T) -> SlotkeeperError {
    SlotkeeperError::ConflictError(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> SlotkeeperError {
    SlotkeeperError::ExternalServiceError {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> SlotkeeperError {
    SlotkeeperError::InternalError(message.to_string())
}
