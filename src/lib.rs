#[cfg(feature = "api")]
pub use api;
pub use geoip;

pub mod config;
