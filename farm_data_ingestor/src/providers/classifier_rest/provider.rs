use std::{num::NonZeroU32, time::Duration};

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use snafu::{OptionExt, ResultExt};

use crate::{
    models::{classification::Classification, image::ImageUpload},
    providers::{
        ClientBuildSnafu, CropClassifier, InvalidRateLimitSnafu, ProviderError, ProviderInitError,
        classifier_rest::response::ClassifierResponse,
    },
};

/// Default request timeout; image inference can be slow on a cold start.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`RestClassifier`].
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    /// Full URL of the predict endpoint.
    pub endpoint: String,
    pub timeout: Duration,
    /// Client-side cap on calls per minute; `None` disables limiting.
    pub requests_per_minute: Option<u32>,
}

impl ClassifierSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_TIMEOUT,
            requests_per_minute: None,
        }
    }
}

/// Classifier reached over HTTP: `POST <endpoint>` with a multipart body
/// holding the image under the `image` field.
pub struct RestClassifier {
    client: Client,
    endpoint: String,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl RestClassifier {
    /// Creates a new classifier client.
    pub fn new(settings: ClassifierSettings) -> Result<Self, ProviderInitError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context(ClientBuildSnafu)?;

        let limiter = match settings.requests_per_minute {
            Some(rpm) => {
                let rpm = NonZeroU32::new(rpm).context(InvalidRateLimitSnafu)?;
                Some(RateLimiter::direct(Quota::per_minute(rpm)))
            }
            None => None,
        };

        Ok(Self {
            client,
            endpoint: settings.endpoint,
            limiter,
        })
    }
}

#[async_trait]
impl CropClassifier for RestClassifier {
    async fn classify(&self, image: &ImageUpload) -> Result<Classification, ProviderError> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)?;
        let form = Form::new().part("image", part);

        tracing::debug!(
            endpoint = %self.endpoint,
            bytes = image.bytes.len(),
            "Sending image to classifier"
        );

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown classifier error".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(ProviderError::Internal("No response from AI service".to_string()));
        }

        let parsed: ClassifierResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Internal(format!("malformed classifier response: {e}")))?;

        parsed.into_classification()
    }
}
