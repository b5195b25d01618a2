//! Core library for the `weather-job` batch job.
//!
//! This crate defines:
//! - Configuration loading (API key, location, database settings)
//! - The weatherstack client that fetches and normalizes one observation
//! - The `weather_data` store that persists it
//!
//! It is used by `weather-job`, which runs [`job::run`] once per invocation.

pub mod config;
pub mod error;
pub mod job;
pub mod model;
pub mod provider;
pub mod store;

pub use config::{Config, DatabaseConfig, ProviderConfig};
pub use error::{Error, Result};
pub use model::{StoredObservation, WeatherObservation, WeatherRequest};
pub use provider::WeatherstackClient;
pub use store::WeatherStore;
