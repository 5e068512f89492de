#![cfg(test)]
use farm_data_ingestor::providers::{
    WeatherError, WeatherProvider, openweather::provider::OpenWeatherProvider,
};
use secrecy::SecretString;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

fn provider_for(server: &MockServer) -> OpenWeatherProvider {
    OpenWeatherProvider::with_api_key(server.uri(), SecretString::new("test-key".into()))
        .expect("provider should build")
}

#[tokio::test]
async fn test_current_weather_sends_query_and_converts_units() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Nairobi"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "main": { "temp": 24.6, "humidity": 55, "pressure": 1018 },
            "wind": { "speed": 5.0 },
            "weather": [{ "description": "scattered clouds" }],
            "visibility": 10000
        })))
        .expect(1)
        .mount(&server)
        .await;

    let snapshot = provider_for(&server).current("  Nairobi ").await.unwrap();

    assert_eq!(snapshot.temperature, 25.0);
    assert_eq!(snapshot.wind_speed, 18.0);
    assert_eq!(snapshot.visibility, 10.0);
    assert_eq!(snapshot.description, "scattered clouds");
}

#[tokio::test]
async fn test_unknown_location_is_reported_distinctly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "cod": "404", "message": "city not found" })))
        .mount(&server)
        .await;

    let err = provider_for(&server).current("Atlantis").await.unwrap_err();
    assert!(matches!(err, WeatherError::LocationNotFound { ref location } if location == "Atlantis"));
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = provider_for(&server).forecast("Nairobi").await.unwrap_err();
    assert!(matches!(err, WeatherError::Unavailable { .. }));
    assert_eq!(err.to_string(), "Failed to fetch weather data. Please try again later.");
}

#[tokio::test]
async fn test_forecast_keeps_one_slot_per_day() {
    let list: Vec<_> = (0..40)
        .map(|i| {
            json!({
                "dt_txt": format!("slot-{i}"),
                "main": { "temp": 20.0, "humidity": 60 },
                "wind": { "speed": 2.0 },
                "weather": [{ "description": "clear sky" }],
                "pop": 0.25
            })
        })
        .collect();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": list })))
        .mount(&server)
        .await;

    let days = provider_for(&server).forecast("Nairobi").await.unwrap();
    let dates: Vec<_> = days.iter().map(|d| d.date.as_str()).collect();
    assert_eq!(dates, ["slot-0", "slot-8", "slot-16", "slot-24", "slot-32"]);
}
