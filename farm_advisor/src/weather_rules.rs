//! Threshold rules over a [`WeatherSnapshot`].
//!
//! [`generate_weather_recommendations`] may legitimately return an empty list;
//! callers show [`FAVORABLE_CONDITIONS`] instead.

use farm_data_ingestor::models::weather::WeatherSnapshot;
use serde::Serialize;

pub const FAVORABLE_CONDITIONS: &str = "Weather conditions are favorable for farming activities";

/// Ordered farming advice: temperature, humidity, wind, precipitation, UV,
/// dew point.
pub fn generate_weather_recommendations(weather: &WeatherSnapshot) -> Vec<String> {
    let mut out = Vec::new();

    if weather.temperature <= 2.0 {
        out.push("Risk of frost damage. Use frost protection methods and avoid watering in the evening.");
    } else if weather.temperature >= 35.0 {
        out.push("High temperature stress likely. Increase irrigation frequency and consider shade protection.");
    }

    if weather.humidity > 85.0 {
        out.push("High humidity increases disease risk. Monitor for fungal diseases and ensure good air circulation.");
    } else if weather.humidity < 30.0 {
        out.push("Low humidity may cause water stress. Consider irrigation and mulching.");
    }

    if weather.wind_speed > 30.0 {
        out.push("Strong winds may damage crops. Secure structures and avoid spraying operations.");
    }

    if weather.precipitation > 0.0 {
        out.push("Rain expected. Adjust irrigation schedules and monitor soil drainage.");
    }

    if weather.uv_index > 8.0 {
        out.push("High UV levels. Consider protective measures for sensitive crops.");
    }

    if weather.dew_point < 2.0 {
        out.push("Low dew point indicates frost risk. Protect sensitive crops overnight.");
    }

    out.into_iter().map(str::to_string).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Frost,
    Heat,
    Wind,
    Rain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Severe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeatherAlert {
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: &'static str,
}

fn severity(severe: bool) -> AlertSeverity {
    if severe {
        AlertSeverity::Severe
    } else {
        AlertSeverity::Warning
    }
}

/// Banner alerts for hazardous conditions.
pub fn generate_weather_alerts(weather: &WeatherSnapshot) -> Vec<WeatherAlert> {
    let mut alerts = Vec::new();
    let description = weather.description.to_lowercase();

    if weather.temperature <= 2.0 {
        alerts.push(WeatherAlert {
            kind: AlertKind::Frost,
            severity: severity(weather.temperature <= 0.0),
            message: "Risk of frost damage to crops. Consider protective measures.",
        });
    }

    if weather.temperature >= 35.0 {
        alerts.push(WeatherAlert {
            kind: AlertKind::Heat,
            severity: severity(weather.temperature >= 38.0),
            message: "High temperature may cause crop stress. Ensure adequate irrigation.",
        });
    }

    if weather.wind_speed >= 30.0 {
        alerts.push(WeatherAlert {
            kind: AlertKind::Wind,
            severity: severity(weather.wind_speed >= 40.0),
            message: "High winds may affect crops and spraying operations.",
        });
    }

    if description.contains("rain") || description.contains("storm") {
        alerts.push(WeatherAlert {
            kind: AlertKind::Rain,
            severity: severity(description.contains("heavy")),
            message: "Precipitation expected. Plan field operations accordingly.",
        });
    }

    alerts
}
