use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AeroError, Result};

/// Raw query string of `GET /api/weather-probability`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbabilityQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub date: Option<String>,
}

/// A validated probability request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityRequest {
    pub location: Location,
    pub start_date: NaiveDate,
    /// The date exactly as the caller sent it; echoed back in the response.
    pub raw_date: String,
}

impl ProbabilityQuery {
    pub fn new(lat: &str, lon: &str, date: &str) -> Self {
        Self { lat: Some(lat.to_string()), lon: Some(lon.to_string()), date: Some(date.to_string()) }
    }

    /// Check presence first (any empty or absent field is "missing"), then well-formedness.
    pub fn validate(self) -> Result<ProbabilityRequest> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let (Some(lat), Some(lon), Some(date)) =
            (present(self.lat), present(self.lon), present(self.date))
        else {
            return Err(AeroError::MissingParameters);
        };

        let lat_value = parse_coordinate("lat", &lat, 90.0)?;
        let lon_value = parse_coordinate("lon", &lon, 180.0)?;
        let start_date = parse_date(&date)?;

        Ok(ProbabilityRequest {
            location: Location { lat: lat_value, lon: lon_value },
            start_date,
            raw_date: date,
        })
    }
}

fn parse_coordinate(name: &'static str, raw: &str, limit: f64) -> Result<f64> {
    let invalid = || AeroError::InvalidParameter { name, value: raw.to_string() };

    let value: f64 = raw.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value.abs() > limit {
        return Err(invalid());
    }

    Ok(value)
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (its UTC date is used).
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| {
            DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .map_err(|_| AeroError::InvalidParameter { name: "date", value: raw.to_string() })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// Threshold-exceedance percentages, each in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probabilities {
    pub heat: u8,
    pub rain: u8,
    pub wind: u8,
    pub snow: u8,
}

/// Means over the sampled years, rounded to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Averages {
    pub temperature: f64,
    pub rainfall: f64,
    pub wind_speed: f64,
    pub humidity: f64,
    pub solar_radiation: f64,
    pub cloud_cover: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Details {
    pub heat: String,
    pub rain: String,
    pub wind: String,
    pub snow: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    /// 1-based month offset from the start date.
    pub month: u8,
    pub date: NaiveDate,
    /// e.g. "June 2020"
    pub month_name: String,
    pub is_future_prediction: bool,
    pub confidence: u8,
    pub probabilities: Probabilities,
    pub averages: Averages,
    pub details: Details,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilityResponse {
    pub location: Location,
    pub start_date: String,
    pub is_future_prediction: bool,
    pub monthly_forecasts: Vec<MonthlySummary>,
}
