use serde::Serialize;

use crate::navigation::ProviderError;

pub type GuardResult<T> = Result<T, GuardError>;

/// Numeric code carried by every authorization denial.
pub const DENIED_CODE: u16 = 401;

/// Message attached to a denied navigation.
pub const DENIED_MESSAGE: &str = "permission check failed";

#[derive(thiserror::Error, Debug)]
pub enum GuardError {
    #[error("authorization denied for {route}: {message}")]
    AuthorizationDenied { route: String, message: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("gate dropped before the queued operation could run")]
    Abandoned,
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("invalid manifest at {path}: {message}")]
    Manifest { path: String, message: String },
    #[error("invalid resource pattern")]
    InvalidPattern(#[from] regex::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GuardError {
    pub fn denied(route: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            route: route.into(),
            message: DENIED_MESSAGE.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// The programmatic code for this failure, if it has one.
    pub fn code(&self) -> Option<u16> {
        match self {
            GuardError::AuthorizationDenied { .. } => Some(DENIED_CODE),
            _ => None,
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, GuardError::AuthorizationDenied { .. })
    }

    pub fn payload(&self) -> ErrorPayload {
        let error = match self {
            GuardError::AuthorizationDenied { .. } => "authorization_denied",
            GuardError::Provider(_) => "provider",
            GuardError::Abandoned => "abandoned",
            GuardError::Configuration(_) => "configuration",
            GuardError::Manifest { .. } => "manifest",
            GuardError::InvalidPattern(_) => "invalid_pattern",
            GuardError::Io(_) => "io",
        };

        let message = match self {
            GuardError::AuthorizationDenied { message, .. } => message.clone(),
            other => other.to_string(),
        };

        ErrorPayload {
            code: self.code(),
            error: error.to_string(),
            message,
        }
    }
}

/// Structured failure handed to callers at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub error: String,
    pub message: String,
}
