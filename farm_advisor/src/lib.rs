//! Core of the farm advisor: soil and weather rule engines, the record store,
//! the crop-image submission pipeline and the glue that wires them together.
//!
//! External services (classifier, weather, storage, auth) live behind the
//! traits in [`farm_data_ingestor::providers`]; this crate only depends on
//! those traits, so every flow here can be driven with fakes in tests.

pub mod app;
pub mod cache;
pub mod clock;
pub mod config;
pub mod db;
pub mod history;
pub mod pipeline;
pub mod records;
pub mod schema;
pub mod session;
pub mod soil;
pub mod tz;
pub mod weather_rules;
