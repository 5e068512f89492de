use thiserror::Error;

/// Errors that can occur within a provider implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The request parameters were invalid for this specific provider.
    #[error("Invalid parameters for provider: {0}")]
    Validation(String),

    /// The provider answered but the payload was unusable.
    #[error("Internal provider error: {0}")]
    Internal(String),

    /// Local filesystem failure (filesystem-backed providers).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Request(e) if e.is_timeout())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Weather lookup failures, split so callers can show a specific message for
/// an unknown location.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location not found. Please check the spelling and try again.")]
    LocationNotFound { location: String },

    #[error("Failed to fetch weather data. Please try again later.")]
    Unavailable {
        #[source]
        source: ProviderError,
    },
}

impl From<ProviderError> for WeatherError {
    fn from(source: ProviderError) -> Self {
        Self::Unavailable { source }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::from(e).into()
    }
}

/// Authentication failures with user-facing messages.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    AlreadyRegistered,

    #[error("Password must be at least 6 characters long")]
    WeakPassword,

    #[error("Please verify your email address")]
    EmailNotConfirmed,

    /// Any other message the service returned, passed through verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("Authentication failed")]
    Transport(#[source] ProviderError),
}

impl AuthError {
    /// Maps a raw auth-service message to a user-facing error.
    pub fn from_message(message: &str) -> Self {
        if message.contains("Invalid login credentials") {
            Self::InvalidCredentials
        } else if message.contains("User already registered") {
            Self::AlreadyRegistered
        } else if message.contains("Password should be at least 6 characters") {
            Self::WeakPassword
        } else if message.contains("Email not confirmed") {
            Self::EmailNotConfirmed
        } else if message.trim().is_empty() {
            Self::Rejected("Authentication failed".to_string())
        } else {
            Self::Rejected(message.to_string())
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.into())
    }
}
