pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use models::*;

use anyhow::Result;
use std::sync::Arc;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub api_client: Arc<services::api_client::ApiClient>,
    pub recommendation_service: Arc<services::recommendation::RecommendationService>,
    pub serving_service: Arc<services::serving::ServingService>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        let api_client = Arc::new(services::api_client::ApiClient::new(
            &config.api,
            &config.cache,
        )?);

        let recommendation_service = Arc::new(
            services::recommendation::RecommendationService::new(
                api_client.clone(),
                config.recommendation.clone(),
            ),
        );

        let serving_service = Arc::new(services::serving::ServingService::new(
            recommendation_service.clone(),
        ));

        Ok(Self {
            config,
            api_client,
            recommendation_service,
            serving_service,
        })
    }
}

/// Builds the log subscriber described by `config`. `RUST_LOG` overrides the
/// configured level when set. Output goes to stderr.
pub fn build_subscriber(config: &config::LoggingConfig) -> Result<Dispatch> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let dispatch = match config.format.as_str() {
        "json" => Dispatch::new(builder.json().finish()),
        _ => Dispatch::new(builder.finish()),
    };
    Ok(dispatch)
}

/// Installs the subscriber for the whole process. Only binaries call this.
pub fn init_tracing(config: &config::LoggingConfig) -> Result<()> {
    let dispatch = build_subscriber(config)?;
    tracing::dispatcher::set_global_default(dispatch)?;
    Ok(())
}
