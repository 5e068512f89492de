//! Sign-in state for the current process.
//!
//! [`SessionManager`] does not act as a global: it publishes the current
//! session on a `watch` channel, and callers still pass the [`Session`]
//! explicitly to every store and pipeline call. Every change to a signed-in
//! session re-syncs the user's profile row.

use std::sync::Arc;

use farm_data_ingestor::{
    models::session::{Session, SignUpOutcome, UserIdentity},
    providers::{AuthError, AuthProvider},
};
use secrecy::SecretString;
use tokio::sync::watch;

use crate::records::{ProfileStore, StoreError, UserProfile};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Failed to create user profile")]
    Profile(#[source] StoreError),

    #[error("User must be logged in")]
    NotSignedIn,

    #[error("Session expired. Please sign in again.")]
    Expired,
}

/// Result of [`SessionManager::sign_up`].
#[derive(Debug)]
pub enum SignUpResult {
    SignedIn(Arc<Session>),
    /// The account must be confirmed by email before signing in.
    ConfirmationRequired(UserIdentity),
}

pub struct SessionManager {
    auth: Arc<dyn AuthProvider>,
    profiles: Arc<dyn ProfileStore>,
    current: watch::Sender<Option<Arc<Session>>>,
}

impl SessionManager {
    pub fn new(auth: Arc<dyn AuthProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            auth,
            profiles,
            current,
        }
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.borrow().clone()
    }

    /// The current session, or [`SessionError::NotSignedIn`].
    pub fn require(&self) -> Result<Arc<Session>, SessionError> {
        self.current().ok_or(SessionError::NotSignedIn)
    }

    /// Session-change notifications.
    pub fn watch(&self) -> watch::Receiver<Option<Arc<Session>>> {
        self.current.subscribe()
    }

    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Arc<Session>, SessionError> {
        let session = self.auth.sign_in(email.trim(), password).await?;
        tracing::info!(user_id = %session.user_id(), "Signed in");
        self.activate(session, None).await
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        name: &str,
    ) -> Result<SignUpResult, SessionError> {
        let name = name.trim();
        match self.auth.sign_up(email.trim(), password, name).await? {
            SignUpOutcome::SignedIn(session) => {
                tracing::info!(user_id = %session.user_id(), "Signed up");
                Ok(SignUpResult::SignedIn(self.activate(session, Some(name)).await?))
            }
            SignUpOutcome::ConfirmationRequired(user) => {
                tracing::info!(user_id = %user.id, "Signed up, email confirmation pending");
                Ok(SignUpResult::ConfirmationRequired(user))
            }
        }
    }

    /// Re-adopts a session obtained earlier, after checking it with the auth
    /// service.
    pub async fn restore(&self, session: Session) -> Result<Arc<Session>, SessionError> {
        let Some(user) = self.auth.current_user(&session).await? else {
            self.current.send_replace(None);
            return Err(SessionError::Expired);
        };
        let session = Session { user, ..session };
        self.activate(session, None).await
    }

    /// Ends the local session, then revokes it remotely.
    ///
    /// The local session is gone even when the remote call fails; that
    /// failure is still returned.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let Some(session) = self.current.send_replace(None) else {
            return Ok(());
        };
        if let Err(err) = self.auth.sign_out(&session).await {
            tracing::warn!(user_id = %session.user_id(), error = %err, "Remote sign-out failed");
            return Err(err.into());
        }
        tracing::info!(user_id = %session.user_id(), "Signed out");
        Ok(())
    }

    pub async fn profile(&self) -> Result<Option<UserProfile>, SessionError> {
        let session = self.require()?;
        self.profiles
            .get_profile(session.user_id())
            .await
            .map_err(SessionError::Profile)
    }

    async fn activate(&self, session: Session, name: Option<&str>) -> Result<Arc<Session>, SessionError> {
        self.profiles
            .ensure_profile(&session.user, name)
            .await
            .map_err(SessionError::Profile)?;
        let session = Arc::new(session);
        self.current.send_replace(Some(Arc::clone(&session)));
        Ok(session)
    }
}
