//! Error types shared by the climate source, the aggregator boundary and the API.

use thiserror::Error;

/// Message returned to clients when any of the required query parameters is absent.
pub const MISSING_PARAMETERS_MESSAGE: &str = "Latitude, longitude, and date are required.";

/// Message returned to clients for every upstream failure.
pub const UPSTREAM_FAILURE_MESSAGE: &str = "Failed to retrieve or process data from NASA API.";

#[derive(Error, Debug)]
pub enum AeroError {
    #[error("Latitude, longitude, and date are required.")]
    MissingParameters,

    #[error("Invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Upstream request failed with status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Malformed upstream payload: {0}")]
    MalformedPayload(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AeroError {
    /// Whether the error was caused by the caller's input rather than the upstream source.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingParameters | Self::InvalidParameter { .. })
    }

    /// Message safe to hand back to an API client.
    pub fn client_message(&self) -> String {
        match self {
            Self::MissingParameters => MISSING_PARAMETERS_MESSAGE.to_string(),
            Self::InvalidParameter { .. } => self.to_string(),
            Self::Config(_) => "Server misconfigured.".to_string(),
            Self::Network(_) | Self::UpstreamStatus { .. } | Self::MalformedPayload(_) => {
                UPSTREAM_FAILURE_MESSAGE.to_string()
            }
        }
    }
}

pub type Result<T, E = AeroError> = std::result::Result<T, E>;
