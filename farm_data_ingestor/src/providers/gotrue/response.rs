use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use serde::Deserialize;

use crate::models::session::{Session, UserIdentity};

#[derive(Deserialize, Debug)]
pub struct UserResponse {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: Option<serde_json::Value>,
}

impl From<UserResponse> for UserIdentity {
    fn from(u: UserResponse) -> Self {
        let name = u
            .user_metadata
            .as_ref()
            .and_then(|m| m.get("name"))
            .and_then(|n| n.as_str())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        UserIdentity {
            id: u.id,
            email: u.email.unwrap_or_default(),
            name,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires.
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: UserResponse,
}

impl TokenResponse {
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        Session {
            user: self.user.into(),
            access_token: SecretString::new(self.access_token.into()),
            refresh_token: self.refresh_token.map(|t| SecretString::new(t.into())),
            expires_at: self.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }
}

/// Sign-up answers with a full session when accounts are auto-confirmed and
/// with the bare user otherwise.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(TokenResponse),
    User(UserResponse),
}

/// Error payloads differ between endpoints; take whichever message is set.
#[derive(Deserialize, Debug, Default)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn into_message(self) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_without_session_parses_as_user() {
        let r: SignUpResponse =
            serde_json::from_str(r#"{"id":"u-1","email":"a@b.c","user_metadata":{"name":"Wanjiru"}}"#).unwrap();
        match r {
            SignUpResponse::User(u) => {
                let id = UserIdentity::from(u);
                assert_eq!(id.name.as_deref(), Some("Wanjiru"));
            }
            SignUpResponse::Session(_) => panic!("expected bare user"),
        }
    }

    #[test]
    fn error_message_precedence() {
        let e: ErrorResponse =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .unwrap();
        assert_eq!(e.into_message(), "Invalid login credentials");
    }
}
