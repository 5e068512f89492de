//! Blob storage backends for uploaded crop images.

pub mod fs;
pub mod http;

pub use fs::FsObjectStorage;
pub use http::HttpObjectStorage;
