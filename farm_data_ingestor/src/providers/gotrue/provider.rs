use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response, StatusCode, header};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use shared_utils::env::get_env_var;
use snafu::ResultExt;

use crate::{
    models::session::{Session, SignUpOutcome, UserIdentity},
    providers::{
        AuthError, AuthProvider, ClientBuildSnafu, InvalidApiKeySnafu, MissingEnvVarSnafu,
        ProviderInitError,
        gotrue::response::{ErrorResponse, SignUpResponse, TokenResponse, UserResponse},
    },
};

pub struct GoTrueAuth {
    client: Client,
    base_url: String,
}

impl GoTrueAuth {
    /// Creates a new auth client.
    ///
    /// Reads the public API key from the `FARM_API_KEY` environment variable.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderInitError> {
        let api_key = SecretString::new(get_env_var("FARM_API_KEY").context(MissingEnvVarSnafu)?.into());
        Self::with_api_key(base_url, &api_key)
    }

    pub fn with_api_key(base_url: impl Into<String>, api_key: &SecretString) -> Result<Self, ProviderInitError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "apikey",
            header::HeaderValue::from_str(api_key.expose_secret()).context(InvalidApiKeySnafu)?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }
}

/// Turns a non-success response into a mapped [`AuthError`].
async fn rejection(response: Response) -> AuthError {
    let status = response.status();
    let body: ErrorResponse = response.json().await.unwrap_or_default();
    let message = body.into_message();
    tracing::debug!(%status, %message, "Auth service rejected request");
    AuthError::from_message(&message)
}

#[async_trait]
impl AuthProvider for GoTrueAuth {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, AuthError> {
        let response = self
            .client
            .post(self.url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password.expose_secret() }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.into_session(Utc::now()))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .client
            .post(self.url("signup"))
            .json(&json!({
                "email": email,
                "password": password.expose_secret(),
                "data": { "name": name },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        Ok(match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session(token) => SignUpOutcome::SignedIn(token.into_session(Utc::now())),
            SignUpResponse::User(user) => SignUpOutcome::ConfirmationRequired(user.into()),
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.url("logout"))
            .bearer_auth(session.access_token.expose_secret())
            .send()
            .await?;

        // An already-expired token means the session is gone anyway.
        if response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(rejection(response).await)
    }

    async fn current_user(&self, session: &Session) -> Result<Option<UserIdentity>, AuthError> {
        let response = self
            .client
            .get(self.url("user"))
            .bearer_auth(session.access_token.expose_secret())
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                let user: UserResponse = response.json().await?;
                Ok(Some(user.into()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            _ => Err(rejection(response).await),
        }
    }
}
