use crate::{
    Config,
    aggregate::YearRange,
    cache::CachedSource,
    error::Result,
    model::Location,
    provider::power::PowerSource,
    series::DailySeries,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc, time::Duration};

pub mod power;

/// Somewhere a multi-year daily series for a point can be fetched from.
#[async_trait]
pub trait ClimateSource: Send + Sync + Debug {
    async fn fetch(&self, location: Location, years: YearRange) -> Result<Arc<DailySeries>>;
}

/// Construct the climate source described by the config, wrapped in the series
/// cache when it is enabled.
pub fn source_from_config(config: &Config) -> Result<Arc<dyn ClimateSource>> {
    config.validate()?;

    let upstream = &config.upstream;
    let power = PowerSource::new(
        &upstream.base_url,
        &upstream.community,
        Duration::from_secs(upstream.timeout_secs),
    )?;

    let source: Arc<dyn ClimateSource> = if config.cache.enabled {
        Arc::new(CachedSource::new(
            power,
            Duration::from_secs(config.cache.ttl_secs),
            config.cache.capacity,
        ))
    } else {
        Arc::new(power)
    };

    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AeroError;

    #[test]
    fn source_from_default_config_is_plain_power() {
        let source = source_from_config(&Config::default()).expect("default config is valid");
        assert!(format!("{source:?}").contains("PowerSource"));
    }

    #[test]
    fn source_from_config_wraps_cache_when_enabled() {
        let mut cfg = Config::default();
        cfg.cache.enabled = true;

        let source = source_from_config(&cfg).expect("config is valid");
        assert!(format!("{source:?}").starts_with("CachedSource"));
    }

    #[test]
    fn source_from_config_rejects_invalid_config() {
        let mut cfg = Config::default();
        cfg.years = YearRange { start: 2024, end: 1985 };

        let err = source_from_config(&cfg).unwrap_err();
        assert!(matches!(err, AeroError::Config(_)));
    }
}
