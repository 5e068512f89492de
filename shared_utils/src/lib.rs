//! Small helpers shared by the farm advisor crates: environment lookups and
//! TOML file loading.

pub mod config;
pub mod env;
