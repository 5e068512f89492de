use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Unit system requested from the service. The rule engine expects metric.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    fn as_str(self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }
}

/// Builds the query string for a lookup by location name.
pub fn construct_params(location: &str, api_key: &SecretString, units: Units) -> Vec<(&'static str, String)> {
    vec![
        ("q", location.trim().to_string()),
        ("appid", api_key.expose_secret().to_string()),
        ("units", units.as_str().to_string()),
    ]
}
