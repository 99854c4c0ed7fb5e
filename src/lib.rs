pub mod config;
pub mod error;
pub mod motivation;
pub mod telemetry;
