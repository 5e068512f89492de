//! HTTP client for the crop-disease classifier (multipart upload, JSON reply).

pub mod provider;
pub mod response;

pub use provider::{ClassifierSettings, RestClassifier};
