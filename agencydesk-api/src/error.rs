//! Failures of remote calls
//!
//! Authorization mismatches are not errors; they never appear here.

use agencydesk_auth::UserClass;
use agencydesk_core::AgencyError;
use reqwest::StatusCode;
use thiserror::Error;

/// Why a login (or token verification) did not produce a session
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Login service unavailable (HTTP {status})")]
    ServiceUnavailable { status: u16 },

    #[error("Server error (HTTP {status})")]
    Server { status: u16 },

    #[error("Network unreachable: {message}")]
    Network { message: String },

    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },

    #[error("Unexpected response (HTTP {status})")]
    Unexpected { status: u16 },

    #[error("Login was superseded by a newer request")]
    Superseded,

    #[error("{message}")]
    Validation {
        message: String,
        field: &'static str,
    },

    #[error("Failed to store session: {0}")]
    Storage(#[source] AgencyError),
}

impl AuthError {
    /// Map a non-2xx status of the auth endpoints
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => AuthError::InvalidCredentials,
            StatusCode::NOT_FOUND => AuthError::ServiceUnavailable {
                status: status.as_u16(),
            },
            s if s.is_server_error() => AuthError::Server { status: s.as_u16() },
            s => AuthError::Unexpected { status: s.as_u16() },
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        AuthError::MalformedResponse {
            reason: reason.into(),
        }
    }

    /// Message suitable for a toast or an inline form error
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "The email or password is incorrect.",
            AuthError::ServiceUnavailable { .. } => {
                "The login service is not available right now. Please try again later."
            }
            AuthError::Server { .. } => "The server ran into a problem. Please try again later.",
            AuthError::Network { .. } => {
                "Could not reach the server. Check your connection and try again."
            }
            AuthError::MalformedResponse { .. } | AuthError::Unexpected { .. } => {
                "The server sent an unexpected response."
            }
            AuthError::Superseded => "A newer login attempt replaced this one.",
            AuthError::Validation { .. } => "Please enter both email and password.",
            AuthError::Storage(_) => "Signed in, but the session could not be saved locally.",
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            AuthError::malformed(error.to_string())
        } else {
            AuthError::Network {
                message: error.to_string(),
            }
        }
    }
}

/// Failure of an authenticated resource call
#[derive(Error, Debug)]
pub enum ApiError {
    /// The backend rejected the token; the owning session has been cleared
    #[error("Session expired, sign in again at {login_route}")]
    Unauthorized { login_route: String },

    #[error("Not allowed to access {resource}")]
    Forbidden { resource: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Server error (HTTP {status})")]
    Server { status: u16 },

    #[error("Unexpected response (HTTP {status})")]
    Unexpected { status: u16 },

    #[error("Network unreachable: {message}")]
    Network { message: String },

    #[error("Malformed response: {reason}")]
    MalformedResponse { reason: String },

    #[error("No {class} session to authenticate the request")]
    NotAuthenticated { class: UserClass },

    #[error(transparent)]
    Local(#[from] AgencyError),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            ApiError::Validation { field, .. } => field.as_deref(),
            ApiError::Local(inner) => inner.field(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ApiError::MalformedResponse {
                reason: error.to_string(),
            }
        } else {
            ApiError::Network {
                message: error.to_string(),
            }
        }
    }
}
