use async_trait::async_trait;

/// Message shown when a rejection carries no error of its own.
pub const GENERIC_AUTH_ERROR: &str = "An error occurred";

/// Result of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Success,
    Failure { error: Option<String> },
}

impl AuthOutcome {
    pub fn failure<S: Into<String>>(error: S) -> Self {
        Self::Failure {
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns the message to display for a failed attempt.
    ///
    /// Falls back to [`GENERIC_AUTH_ERROR`] when the collaborator supplied none.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Success => None,
            Self::Failure { error } => Some(error.as_deref().unwrap_or(GENERIC_AUTH_ERROR)),
        }
    }
}

/// Credential verification collaborator used by the login form.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> AuthOutcome;
}
