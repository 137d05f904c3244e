use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc, time::Duration};

use crate::{
    aggregate::YearRange,
    error::{AeroError, Result},
    model::Location,
    series::{DailySeries, Variable},
};

use super::ClimateSource;

pub const DEFAULT_BASE_URL: &str = "https://power.larc.nasa.gov";
pub const DEFAULT_COMMUNITY: &str = "RE";

const DAILY_POINT_PATH: &str = "/api/temporal/daily/point";

/// NASA POWER daily point API.
#[derive(Debug, Clone)]
pub struct PowerSource {
    base_url: String,
    community: String,
    http: Client,
}

impl PowerSource {
    pub fn new(base_url: &str, community: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            community: community.to_string(),
            http,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{DAILY_POINT_PATH}", self.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: HashMap<String, HashMap<String, Option<f64>>>,
}

/// Parse a POWER JSON body into a daily series.
///
/// Unknown parameters are ignored; a missing required parameter makes the
/// whole payload unusable.
pub fn parse_payload(body: &str) -> Result<DailySeries> {
    let parsed: PowerResponse = serde_json::from_str(body)
        .map_err(|e| AeroError::MalformedPayload(format!("invalid POWER JSON: {e}")))?;

    let mut series = DailySeries::new();
    for (name, column) in parsed.properties.parameter {
        let Ok(variable) = Variable::try_from(name.as_str()) else {
            tracing::debug!(parameter = %name, "ignoring unrequested POWER parameter");
            continue;
        };

        let column = column.into_iter().filter_map(|(key, value)| Some((key, value?))).collect();
        series.set_column(variable, column);
    }

    if let Some(missing) = Variable::required().iter().find(|v| !series.has_variable(**v)) {
        return Err(AeroError::MalformedPayload(format!("parameter {missing} is absent")));
    }

    Ok(series)
}

#[async_trait]
impl ClimateSource for PowerSource {
    async fn fetch(&self, location: Location, years: YearRange) -> Result<Arc<DailySeries>> {
        let parameters =
            Variable::all().iter().map(Variable::as_str).collect::<Vec<_>>().join(",");
        let url = self.endpoint();

        tracing::debug!(%url, lat = location.lat, lon = location.lon, "requesting POWER series");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("parameters", parameters.as_str()),
                ("community", self.community.as_str()),
                ("longitude", &location.lon.to_string()),
                ("latitude", &location.lat.to_string()),
                ("start", &years.start.to_string()),
                ("end", &years.end.to_string()),
                ("format", "JSON"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(AeroError::UpstreamStatus {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let series = parse_payload(&body)?;
        tracing::debug!(
            days = series.len(Variable::MaxTemperature),
            "POWER series received"
        );

        Ok(Arc::new(series))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
