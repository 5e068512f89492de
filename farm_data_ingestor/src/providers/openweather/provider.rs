use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use shared_utils::env::get_env_var;
use snafu::ResultExt;

use crate::{
    models::weather::{ForecastDay, WeatherSnapshot},
    providers::{
        ClientBuildSnafu, MissingEnvVarSnafu, ProviderError, ProviderInitError, WeatherError,
        WeatherProvider,
        openweather::{
            params::{Units, construct_params},
            response::{CurrentResponse, ForecastResponse},
        },
    },
};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

pub struct OpenWeatherProvider {
    client: Client,
    base_url: String,
    api_key: SecretString,
    units: Units,
}

impl OpenWeatherProvider {
    /// Creates a new weather provider.
    ///
    /// Reads the API key from the `WEATHER_API_KEY` environment variable.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderInitError> {
        let api_key = get_env_var("WEATHER_API_KEY").context(MissingEnvVarSnafu)?;
        Self::with_api_key(base_url, SecretString::new(api_key.into()))
    }

    pub fn with_api_key(
        base_url: impl Into<String>,
        api_key: SecretString,
    ) -> Result<Self, ProviderInitError> {
        let client = Client::builder().build().context(ClientBuildSnafu)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            units: Units::Metric,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        location: &str,
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let query = construct_params(location, &self.api_key, self.units);

        let response = self.client.get(&url).query(&query).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::LocationNotFound {
                location: location.to_string(),
            });
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            tracing::warn!(%status, endpoint, "Weather API returned an error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, location: &str) -> Result<WeatherSnapshot, WeatherError> {
        let r: CurrentResponse = self.get_json("weather", location).await?;
        Ok(r.into())
    }

    async fn forecast(&self, location: &str) -> Result<Vec<ForecastDay>, WeatherError> {
        let r: ForecastResponse = self.get_json("forecast", location).await?;
        Ok(r.into_days())
    }
}
