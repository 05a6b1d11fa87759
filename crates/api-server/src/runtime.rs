use anyhow::{Context, Result};
use credit_core::DataSource;
use credit_ingest::StubDataSource;
use credit_pipeline::{PlaceholderScheduler, ScoringPipeline};
use credit_store::{CreditDb, CreditStore};
use scoring_engine::ScoringEngine;
use std::sync::Arc;

use crate::config::ApiConfig;
use crate::AppState;

/// Everything the server owns for its lifetime.
///
/// Built once at startup and torn down explicitly; handlers only see the
/// cloned [`AppState`].
pub struct AppRuntime {
    state: AppState,
    scheduler: Option<PlaceholderScheduler>,
}

impl AppRuntime {
    pub async fn init(config: ApiConfig) -> Result<Self> {
        Self::with_source(config, Arc::new(StubDataSource::new())).await
    }

    pub async fn with_source(config: ApiConfig, source: Arc<dyn DataSource>) -> Result<Self> {
        let db = CreditDb::new(&config.db_url)
            .await
            .with_context(|| format!("Failed to open credit database at {}", config.db_url))?;
        let store = CreditStore::new(db);

        let engine = ScoringEngine::new(config.forest.clone());
        let forest = engine.config();
        tracing::info!(
            "Scoring engine {}: {} trees, seed {}, max depth {:?}",
            engine.model_version(),
            forest.n_estimators,
            forest.random_state,
            forest.max_depth
        );

        let pipeline =
            ScoringPipeline::new(source, store.clone(), engine).with_news_audit(config.persist_news);

        let scheduler = if config.scheduler_interval.is_zero() {
            tracing::info!("Placeholder scheduler disabled");
            None
        } else {
            Some(PlaceholderScheduler::start(config.scheduler_interval))
        };

        tracing::info!(
            "Runtime ready: source={}, refresh_mode={:?}",
            pipeline.source_name(),
            config.refresh_mode
        );

        Ok(Self {
            state: AppState {
                store,
                pipeline: Arc::new(pipeline),
                config: Arc::new(config),
            },
            scheduler,
        })
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    pub async fn shutdown(self) {
        if let Some(scheduler) = self.scheduler {
            tracing::info!(
                "Stopping placeholder scheduler after {} runs",
                scheduler.runs()
            );
            scheduler.shutdown().await;
        }
        self.state.store.db().pool().close().await;
        tracing::info!("Runtime shut down");
    }
}
