//! OpenWeatherMap-compatible weather client.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::OpenWeatherProvider;
