//! Provider abstraction for the external services behind the farm advisor.
//!
//! Each collaborator is a trait with an async surface and `Send + Sync`
//! bounds so the core crate can hold it as `Arc<dyn ...>` and pick the
//! concrete implementation at runtime from configuration.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use farm_data_ingestor::models::{classification::Classification, image::ImageUpload};
//! use farm_data_ingestor::providers::{CropClassifier, ProviderError};
//!
//! struct AlwaysHealthy;
//!
//! #[async_trait]
//! impl CropClassifier for AlwaysHealthy {
//!     async fn classify(&self, _image: &ImageUpload) -> Result<Classification, ProviderError> {
//!         Ok(Classification {
//!             disease: None,
//!             confidence: 1.0,
//!             recommendation: "No action needed.".into(),
//!             crop_name: None,
//!         })
//!     }
//! }
//! ```

pub mod classifier_rest;
pub mod errors;
pub mod gotrue;
pub mod object_storage;
pub mod openweather;

use async_trait::async_trait;
use secrecy::SecretString;
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::models::{
    classification::Classification,
    image::ImageUpload,
    session::{Session, SignUpOutcome, UserIdentity},
    weather::{ForecastDay, WeatherSnapshot},
};

pub use errors::{AuthError, ProviderError, WeatherError};

/// Remote crop-disease classifier.
///
/// Implementations are not expected to be idempotent: every call may be
/// billed or rate limited, so callers must not replay a call that already
/// succeeded.
#[async_trait]
pub trait CropClassifier: Send + Sync {
    /// Classifies the raw image bytes.
    async fn classify(&self, image: &ImageUpload) -> Result<Classification, ProviderError>;
}

/// Blob storage for uploaded artifacts.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under `path`. Fails if the path is already taken.
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), ProviderError>;

    /// Publicly resolvable URL for an object stored under `path`.
    fn public_url(&self, path: &str) -> String;

    /// Deletes the object stored under `path`.
    async fn remove(&self, path: &str) -> Result<(), ProviderError>;
}

/// Weather lookups by free-text location (e.g. "Nairobi" or "Ames,US").
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, location: &str) -> Result<WeatherSnapshot, WeatherError>;

    /// Up to five daily forecast entries.
    async fn forecast(&self, location: &str) -> Result<Vec<ForecastDay>, WeatherError>;
}

/// Password-based authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        name: &str,
    ) -> Result<SignUpOutcome, AuthError>;

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;

    /// Returns the user behind the session, or `None` when the token is no
    /// longer accepted.
    async fn current_user(&self, session: &Session) -> Result<Option<UserIdentity>, AuthError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("{source}"))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// API key contains invalid characters.
    #[snafu(display("Invalid API key format: {source}"))]
    InvalidApiKey {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },

    /// A rate limit of zero requests was configured.
    #[snafu(display("Rate limit must allow at least one request per minute"))]
    InvalidRateLimit { backtrace: Backtrace },
}
