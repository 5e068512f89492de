//! Authenticated identity and the session object passed to every collaborator.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Identity of a signed-in user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    /// Display name from the sign-up metadata, if any.
    pub name: Option<String>,
}

/// A signed-in session.
///
/// Passed explicitly to the record store and the submission pipeline; the
/// row-ownership filter is derived from [`Session::user_id`].
#[derive(Debug)]
pub struct Session {
    pub user: UserIdentity,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(user: UserIdentity, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: SecretString::new(access_token.into().into_boxed_str()),
            refresh_token: None,
            expires_at: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    /// True when the auth service gave an expiry and it has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Result of a sign-up call.
#[derive(Debug)]
pub enum SignUpOutcome {
    /// The service confirmed the account immediately and opened a session.
    SignedIn(Session),
    /// The account exists but the email must be verified before sign-in.
    ConfirmationRequired(UserIdentity),
}
