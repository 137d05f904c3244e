use aerocast_core::{AppState, Config, ProbabilityQuery, YearRange, api};
use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Confirm, CustomType, Text};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "aerocast", version, about = "Climatological weather probabilities")]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        /// Address to listen on, e.g. "0.0.0.0:3001". Overrides the config file.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Compute probabilities for one location and print them as JSON.
    Query {
        #[arg(long, allow_hyphen_values = true)]
        lat: String,

        #[arg(long, allow_hyphen_values = true)]
        lon: String,

        /// Start date, YYYY-MM-DD.
        #[arg(long)]
        date: String,
    },

    /// Interactively edit the configuration file.
    Configure,

    /// Print the configuration file location.
    ConfigPath,
}

pub fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve { bind } => {
                let mut config = Config::load()?;
                if let Some(bind) = bind {
                    config.bind = bind;
                }
                config.validate()?;

                api::serve(&config).await
            }
            Command::Query { lat, lon, date } => {
                let config = Config::load()?;
                let state = AppState::from_config(&config)?;

                let response = state.evaluate(ProbabilityQuery::new(&lat, &lon, &date)).await?;
                println!("{}", serde_json::to_string_pretty(&response)?);

                Ok(())
            }
            Command::Configure => configure(),
            Command::ConfigPath => {
                println!("{}", Config::config_file_path()?.display());
                Ok(())
            }
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    config.bind = Text::new("Listen address:").with_default(&config.bind).prompt()?;
    config.upstream.base_url =
        Text::new("NASA POWER base URL:").with_default(&config.upstream.base_url).prompt()?;

    let start = CustomType::<i32>::new("First year:")
        .with_default(config.years.start)
        .prompt()?;
    let end = CustomType::<i32>::new("Last year:").with_default(config.years.end).prompt()?;
    config.years = YearRange { start, end };

    config.cache.enabled =
        Confirm::new("Cache fetched series in memory?").with_default(config.cache.enabled).prompt()?;

    config.validate().context("Refusing to save an invalid configuration")?;
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
