//! Stream Authentication
//!
//! Alpaca closes market data sockets that do not authenticate within ten
//! seconds of connecting.
//!
//! # Flow
//!
//! 1. Connect to the WebSocket endpoint
//! 2. Receive `{"T":"success","msg":"connected"}`
//! 3. Send `{"action":"auth","key":"...","secret":"..."}`
//! 4. Receive `{"T":"success","msg":"authenticated"}` or an error
//!
//! # Error Codes
//!
//! - 401: Not authenticated
//! - 402: Authentication failed (invalid credentials)
//! - 403: Already authenticated
//! - 404: Authentication timeout
//! - 406: Connection limit exceeded

use std::time::Duration;

use thiserror::Error;

use super::messages::{AuthRequest, ErrorMessage, SuccessKind, SuccessMessage};
use crate::infrastructure::config::Credentials;

/// Time allowed to finish authenticating after connecting.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors during stream authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Not authenticated (must authenticate before subscribing).
    #[error("not authenticated: must authenticate before making requests")]
    NotAuthenticated,

    /// Invalid API key or secret.
    #[error("authentication failed: invalid API key or secret")]
    InvalidCredentials,

    /// Connection was already authenticated.
    #[error("already authenticated: connection is already authenticated")]
    AlreadyAuthenticated,

    /// Did not authenticate in time.
    #[error("authentication timeout: must authenticate within 10 seconds")]
    Timeout,

    /// Too many concurrent connections for this account.
    #[error("connection limit exceeded: too many concurrent connections")]
    ConnectionLimitExceeded,

    /// Any other server error before authentication completed.
    #[error("server error ({code}): {message}")]
    ServerError {
        /// Error code from server
        code: i32,
        /// Error message from server
        message: String,
    },
}

impl AuthError {
    /// Whether reconnecting could succeed without operator action.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionLimitExceeded)
    }
}

impl From<&ErrorMessage> for AuthError {
    fn from(err: &ErrorMessage) -> Self {
        match err.code {
            401 => Self::NotAuthenticated,
            402 => Self::InvalidCredentials,
            403 => Self::AlreadyAuthenticated,
            404 => Self::Timeout,
            406 => Self::ConnectionLimitExceeded,
            code => Self::ServerError {
                code,
                message: err.msg.clone(),
            },
        }
    }
}

/// Authentication progress on one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Socket not yet acknowledged.
    #[default]
    Disconnected,
    /// Server said "connected"; auth not yet sent.
    Connected,
    /// Auth sent, awaiting reply.
    Authenticating,
    /// Credentials accepted.
    Authenticated,
    /// Server rejected the connection.
    Failed,
}

/// What the connection loop should do after a success message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// Send this auth request.
    SendAuth(AuthRequest),
    /// Authentication finished; subscribe now.
    Authenticated,
    /// Nothing to do.
    Idle,
}

/// Per-connection authentication state machine.
#[derive(Debug)]
pub struct AuthHandler {
    credentials: Credentials,
    state: AuthState,
}

impl AuthHandler {
    /// Create a handler in the disconnected state.
    #[must_use]
    pub const fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            state: AuthState::Disconnected,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AuthState {
        self.state
    }

    /// Check if currently authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated)
    }

    /// Process a success message.
    pub fn on_success(&mut self, msg: &SuccessMessage) -> AuthStep {
        match (msg.msg, self.state) {
            (SuccessKind::Connected, AuthState::Disconnected | AuthState::Connected) => {
                self.state = AuthState::Authenticating;
                AuthStep::SendAuth(AuthRequest::new(
                    self.credentials.api_key().to_string(),
                    self.credentials.api_secret().to_string(),
                ))
            }
            (SuccessKind::Authenticated, AuthState::Authenticated) => AuthStep::Idle,
            (SuccessKind::Authenticated, _) => {
                self.state = AuthState::Authenticated;
                AuthStep::Authenticated
            }
            (SuccessKind::Connected, _) => AuthStep::Idle,
        }
    }

    /// Process an error message received before authentication completed.
    pub fn on_error(&mut self, msg: &ErrorMessage) -> AuthError {
        self.state = AuthState::Failed;
        AuthError::from(msg)
    }
}
