//! AWS Lambda entry point for the feed trigger
//!
//! Deploy with `cargo lambda build --release --features lambda`
//! and attach a schedule rule to the function.

use std::sync::Arc;

use feed_trigger::config::StartupConfig;
use feed_trigger::lambda::handler;
use feed_trigger::models::Config;
use feed_trigger::pipeline::App;
use lambda_runtime::{Error as LambdaError, LambdaEvent, service_fn};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Feed trigger Lambda starting...");

    // Misconfiguration fails the cold start, before any feed is touched.
    let app = match connect().await {
        Ok(app) => Arc::new(app),
        Err(e) => {
            error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };

    lambda_runtime::run(service_fn(move |event: LambdaEvent<_>| {
        let app = Arc::clone(&app);
        async move { handler(app, event).await }
    }))
    .await
}

async fn connect() -> feed_trigger::error::Result<App> {
    let startup = StartupConfig::from_env()?;
    let mut config = Config::default();
    config.apply_env_overrides();
    App::connect(&startup, config).await
}
