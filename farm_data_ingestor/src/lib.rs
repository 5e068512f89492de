//! Clients for the external services the farm advisor depends on.
//!
//! Every collaborator sits behind a trait in [`providers`] so the core crate
//! can swap the HTTP implementations for fakes in tests:
//! - [`providers::CropClassifier`]: crop-disease image classifier
//! - [`providers::WeatherProvider`]: current conditions and 5-day forecast
//! - [`providers::ObjectStorage`]: blob storage for uploaded crop images
//! - [`providers::AuthProvider`]: password sign-in/sign-up and session checks

pub mod models;
pub mod providers;
