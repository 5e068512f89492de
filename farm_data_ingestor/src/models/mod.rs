pub mod classification;
pub mod image;
pub mod session;
pub mod weather;
