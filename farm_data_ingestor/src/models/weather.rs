//! Weather observations in the units the rule engine works with
//! (°C, %, km/h, mm, hPa, km).

use serde::{Deserialize, Serialize};

/// Current conditions at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Air temperature in °C, rounded.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Wind speed in km/h, rounded.
    pub wind_speed: f64,
    pub description: String,
    /// Dew point in °C, rounded.
    pub dew_point: f64,
    pub uv_index: f64,
    /// Rain volume over the last hour in mm.
    pub precipitation: f64,
    /// Pressure in hPa.
    pub pressure: f64,
    /// Visibility in km, rounded.
    pub visibility: f64,
}

/// One day of the 5-day forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    /// Forecast slot as reported by the service (`YYYY-MM-DD HH:MM:SS`).
    pub date: String,
    pub temperature: f64,
    pub humidity: f64,
    pub description: String,
    /// Probability of precipitation in percent.
    pub precipitation: f64,
    pub dew_point: f64,
    pub wind_speed: f64,
}

/// Dew point (°C, rounded) from temperature and relative humidity using the
/// Magnus approximation.
///
/// Humidity is clamped to `[1, 100]` so a reported 0% does not produce NaN.
pub fn dew_point(temperature: f64, humidity: f64) -> f64 {
    const A: f64 = 17.27;
    const B: f64 = 237.7;
    let rh = humidity.clamp(1.0, 100.0);
    let alpha = (A * temperature) / (B + temperature) + (rh / 100.0).ln();
    ((B * alpha) / (A - alpha)).round()
}

/// Converts m/s to km/h, rounded.
pub fn mps_to_kmh(speed: f64) -> f64 {
    (speed * 3.6).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dew_point_matches_reference_values() {
        // Saturated air: dew point equals temperature.
        assert_eq!(dew_point(20.0, 100.0), 20.0);
        assert_eq!(dew_point(25.0, 60.0), 17.0);
        assert_eq!(dew_point(10.0, 50.0), 0.0);
    }

    #[test]
    fn dew_point_zero_humidity_is_finite() {
        assert!(dew_point(30.0, 0.0).is_finite());
    }

    #[test]
    fn wind_conversion_rounds() {
        assert_eq!(mps_to_kmh(5.0), 18.0);
        assert_eq!(mps_to_kmh(8.4), 30.0);
    }
}
