use serde::Deserialize;

use crate::models::weather::{ForecastDay, WeatherSnapshot, dew_point, mps_to_kmh};

/// Forecast entries come in 3-hour slots; every 8th is one per day.
const SLOTS_PER_DAY: usize = 8;
const FORECAST_DAYS: usize = 5;

#[derive(Deserialize, Debug)]
pub struct MainBlock {
    pub temp: f64,
    pub humidity: f64,
    #[serde(default)]
    pub pressure: f64,
}

#[derive(Deserialize, Debug)]
pub struct WindBlock {
    pub speed: f64,
}

#[derive(Deserialize, Debug)]
pub struct Condition {
    pub description: String,
}

#[derive(Deserialize, Debug, Default)]
pub struct RainBlock {
    #[serde(rename = "1h", default)]
    pub one_hour: Option<f64>,
}

#[derive(Deserialize, Debug)]
pub struct CurrentResponse {
    pub main: MainBlock,
    pub wind: WindBlock,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub uvi: Option<f64>,
    #[serde(default)]
    pub rain: Option<RainBlock>,
    /// Meters.
    #[serde(default)]
    pub visibility: Option<f64>,
}

#[derive(Deserialize, Debug)]
pub struct ForecastItem {
    pub dt_txt: String,
    pub main: MainBlock,
    pub wind: WindBlock,
    #[serde(default)]
    pub weather: Vec<Condition>,
    /// Probability of precipitation in `[0, 1]`.
    #[serde(default)]
    pub pop: f64,
}

#[derive(Deserialize, Debug)]
pub struct ForecastResponse {
    pub list: Vec<ForecastItem>,
}

fn first_description(conditions: &[Condition]) -> String {
    conditions
        .first()
        .map(|c| c.description.clone())
        .unwrap_or_default()
}

impl From<CurrentResponse> for WeatherSnapshot {
    fn from(r: CurrentResponse) -> Self {
        let temperature = r.main.temp.round();
        let humidity = r.main.humidity;
        WeatherSnapshot {
            temperature,
            humidity,
            wind_speed: mps_to_kmh(r.wind.speed),
            description: first_description(&r.weather),
            dew_point: dew_point(temperature, humidity),
            uv_index: r.uvi.unwrap_or(0.0),
            precipitation: r.rain.and_then(|rain| rain.one_hour).unwrap_or(0.0),
            pressure: r.main.pressure,
            visibility: (r.visibility.unwrap_or(0.0) / 1000.0).round(),
        }
    }
}

impl ForecastResponse {
    /// One entry per day, at most five days.
    pub fn into_days(self) -> Vec<ForecastDay> {
        self.list
            .into_iter()
            .step_by(SLOTS_PER_DAY)
            .take(FORECAST_DAYS)
            .map(|item| ForecastDay {
                date: item.dt_txt,
                temperature: item.main.temp.round(),
                humidity: item.main.humidity,
                description: first_description(&item.weather),
                precipitation: (item.pop * 100.0).round(),
                dew_point: dew_point(item.main.temp, item.main.humidity),
                wind_speed: mps_to_kmh(item.wind.speed),
            })
            .collect()
    }
}
