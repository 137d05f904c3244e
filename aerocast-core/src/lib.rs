//! Core library for the AeroCast climate-probability service.
//!
//! This crate defines:
//! - The climatological aggregator (40 years of daily records -> 10 monthly summaries)
//! - Abstraction over the daily series and the upstream climate source
//! - The HTTP API and its configuration
//!
//! It is used by `aerocast-cli`, but can also be embedded in other binaries or services.

pub mod aggregate;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod jitter;
pub mod model;
pub mod provider;
pub mod series;

pub use aggregate::{Aggregator, YearRange};
pub use api::{AppState, router};
pub use config::Config;
pub use error::AeroError;
pub use model::{MonthlySummary, ProbabilityQuery, ProbabilityResponse};
pub use provider::ClimateSource;
pub use series::{ClimateSeries, DailySeries, Variable};
