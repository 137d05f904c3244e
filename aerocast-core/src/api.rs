//! HTTP boundary: query validation, upstream fetch, aggregation, JSON out.

use std::{fmt, sync::Arc};

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::{
    Config,
    aggregate::Aggregator,
    error::{AeroError, Result},
    jitter::JitterMode,
    model::{ProbabilityQuery, ProbabilityResponse},
    provider::{ClimateSource, source_from_config},
};

pub const PROBABILITY_PATH: &str = "/api/weather-probability";
pub const BANNER: &str = "AeroCast Backend is running!";

type Today = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Everything a request needs; cheap to clone.
#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn ClimateSource>,
    aggregator: Aggregator,
    jitter: JitterMode,
    today: Today,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("source", &self.source)
            .field("aggregator", &self.aggregator)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(source: Arc<dyn ClimateSource>, aggregator: Aggregator) -> Self {
        Self {
            source,
            aggregator,
            jitter: JitterMode::default(),
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let source = source_from_config(config)?;

        Ok(Self::new(source, Aggregator::new(config.years))
            .with_jitter(JitterMode::from_seed(config.jitter_seed)))
    }

    pub fn with_jitter(mut self, jitter: JitterMode) -> Self {
        self.jitter = jitter;
        self
    }

    /// Replace the local-calendar "today" used to tell history from prediction.
    pub fn with_today<F>(mut self, today: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.today = Arc::new(today);
        self
    }

    /// Validate, fetch and aggregate one request.
    pub async fn evaluate(&self, query: ProbabilityQuery) -> Result<ProbabilityResponse> {
        let request = query.validate()?;
        let series = self.source.fetch(request.location, self.aggregator.years()).await?;

        let today = (self.today)();
        let mut jitter = self.jitter.build();
        let response = self.aggregator.respond(&request, series.as_ref(), today, jitter.as_mut());

        tracing::info!(
            lat = request.location.lat,
            lon = request.location.lon,
            start = %request.start_date,
            future = response.is_future_prediction,
            "probability summary built"
        );

        Ok(response)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AeroError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            tracing::warn!(error = %self, "rejected probability request");
            StatusCode::BAD_REQUEST
        } else {
            tracing::error!(error = %self, "error fetching or processing NASA data");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, Json(ErrorBody { error: self.client_message() })).into_response()
    }
}

async fn banner() -> &'static str {
    BANNER
}

async fn weather_probability(
    State(state): State<AppState>,
    query: std::result::Result<Query<ProbabilityQuery>, QueryRejection>,
) -> Result<Json<ProbabilityResponse>> {
    let Query(query) = query.map_err(|rejection| {
        tracing::debug!(%rejection, "unparseable query string");
        AeroError::MissingParameters
    })?;

    state.evaluate(query).await.map(Json)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route(PROBABILITY_PATH, get(weather_probability))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the configured address and serve until the process is stopped.
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let state = AppState::from_config(config)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, upstream = %config.upstream.base_url, "AeroCast server listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
