use async_trait::async_trait;
use reqwest::{Client, header};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use shared_utils::env::get_env_var;
use snafu::ResultExt;

use crate::providers::{
    ClientBuildSnafu, InvalidApiKeySnafu, MissingEnvVarSnafu, ObjectStorage, ProviderError,
    ProviderInitError,
};

/// Object storage reached through a storage REST API
/// (`/storage/v1/object/{bucket}/{path}`).
pub struct HttpObjectStorage {
    client: Client,
    base_url: String,
    bucket: String,
}

impl HttpObjectStorage {
    /// Creates a new storage client for `bucket`.
    ///
    /// Reads the service key from the `FARM_API_KEY` environment variable.
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>) -> Result<Self, ProviderInitError> {
        let api_key = SecretString::new(get_env_var("FARM_API_KEY").context(MissingEnvVarSnafu)?.into());
        Self::with_api_key(base_url, bucket, &api_key)
    }

    pub fn with_api_key(
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        api_key: &SecretString,
    ) -> Result<Self, ProviderInitError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "apikey",
            header::HeaderValue::from_str(api_key.expose_secret()).context(InvalidApiKeySnafu)?,
        );
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
                .context(InvalidApiKeySnafu)?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<(), ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown storage error".to_string());
    Err(ProviderError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn upload(&self, path: &str, bytes: &[u8], content_type: &str) -> Result<(), ProviderError> {
        let response = self
            .client
            .post(self.object_url(path))
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CACHE_CONTROL, "max-age=3600")
            .header("x-upsert", "false")
            .body(bytes.to_vec())
            .send()
            .await?;
        ensure_success(response).await
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    async fn remove(&self, path: &str) -> Result<(), ProviderError> {
        let response = self
            .client
            .delete(format!("{}/storage/v1/object/{}", self.base_url, self.bucket))
            .json(&json!({ "prefixes": [path] }))
            .send()
            .await?;
        ensure_success(response).await
    }
}
