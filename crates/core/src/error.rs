//! Error types shared by the session layer

use thiserror::Error;

/// Standard result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Sign-out failed: {0}")]
    SignOut(String),

    #[error("Sign-in failed: {0}")]
    SignIn(String),

    #[error("Profile lookup failed: {0}")]
    ProfileFetch(String),

    #[error("Account blocked by an administrator")]
    Blocked,

    #[error("No authenticated session")]
    Inactive,

    #[error("Session supervisor has shut down")]
    Closed,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Create a sign-out error
    pub fn sign_out(message: impl Into<String>) -> Self {
        Self::SignOut(message.into())
    }

    /// Create a sign-in error
    pub fn sign_in(message: impl Into<String>) -> Self {
        Self::SignIn(message.into())
    }

    /// Create a profile lookup error
    pub fn profile_fetch(message: impl Into<String>) -> Self {
        Self::ProfileFetch(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<config::ConfigError> for SessionError {
    fn from(err: config::ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("Serialization error: {err}"))
    }
}
