//! Client for a GoTrue-compatible authentication service.

pub mod provider;
pub mod response;

pub use provider::GoTrueAuth;
