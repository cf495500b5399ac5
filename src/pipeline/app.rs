// src/pipeline/app.rs

//! Production wiring: Socrata registry, Lambda dispatcher, log reporter.

use chrono::Utc;

use crate::config::StartupConfig;
use crate::dispatch::LambdaDispatcher;
use crate::error::Result;
use crate::models::{Config, IngestionSummary, PlanEntry};
use crate::pipeline::{IngestionOrchestrator, JobTarget, LogReporter, plan};
use crate::registry::SocrataRegistry;

/// Connected collaborators, built once per process.
pub struct App {
    config: Config,
    target: JobTarget,
    registry: SocrataRegistry,
    dispatcher: LambdaDispatcher,
}

impl App {
    /// Validate configuration, check the registry schema and set up AWS clients.
    pub async fn connect(startup: &StartupConfig, config: Config) -> Result<Self> {
        config.validate()?;

        let registry = SocrataRegistry::connect(startup, &config.registry).await?;
        let dispatcher = LambdaDispatcher::from_env(&config.dispatch).await;
        let target = JobTarget::new(&startup.job_name, &startup.dataset_id);

        log::info!(
            "Ready: registry {}, job {}",
            startup.registry_location(),
            target.job_name
        );

        Ok(Self {
            config,
            target,
            registry,
            dispatcher,
        })
    }

    /// One full run.
    pub async fn run(&self) -> Result<IngestionSummary> {
        IngestionOrchestrator::new(&self.registry, &self.dispatcher, &LogReporter, &self.target)
            .with_concurrency(self.config.orchestrator.max_concurrent)
            .run()
            .await
    }

    /// Decisions for every active feed at the current instant.
    pub async fn plan(&self) -> Result<Vec<PlanEntry>> {
        plan::plan(&self.registry, Utc::now()).await
    }
}
