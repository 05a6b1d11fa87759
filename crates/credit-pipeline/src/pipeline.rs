use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use credit_core::{CreditError, DataSource, FEATURE_NAMES};
use credit_store::{CreditStore, NewAttribution, NewCreditScore};
use scoring_engine::{ScoringEngine, SyntheticTarget, TargetProvider};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One issuer's outcome in a refresh cycle
#[derive(Debug, Clone, Serialize)]
pub struct ScoredIssuer {
    pub issuer: String,
    pub issuer_id: i64,
    pub score_id: i64,
    pub score: f64,
}

/// Summary of a completed refresh cycle
#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub source: String,
    pub target: String,
    pub model_version: String,
    pub started_at: DateTime<Utc>,
    pub scored_at: Option<DateTime<Utc>>,
    pub news_events: usize,
    pub expected_value: Option<f64>,
    pub scores: Vec<ScoredIssuer>,
}

/// Owns the scoring engine and runs refresh cycles one at a time.
///
/// The engine lock is held from ingestion through persistence, so concurrent
/// callers queue behind each other instead of refitting underneath a run.
pub struct ScoringPipeline {
    source: Arc<dyn DataSource>,
    store: CreditStore,
    targets: Arc<dyn TargetProvider>,
    engine: Mutex<ScoringEngine>,
    persist_news: bool,
}

impl ScoringPipeline {
    pub fn new(source: Arc<dyn DataSource>, store: CreditStore, engine: ScoringEngine) -> Self {
        Self {
            source,
            store,
            targets: Arc::new(SyntheticTarget),
            engine: Mutex::new(engine),
            persist_news: true,
        }
    }

    pub fn with_target_provider(mut self, targets: Arc<dyn TargetProvider>) -> Self {
        self.targets = targets;
        self
    }

    pub fn with_news_audit(mut self, enabled: bool) -> Self {
        self.persist_news = enabled;
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub fn store(&self) -> &CreditStore {
        &self.store
    }

    pub async fn is_fitted(&self) -> bool {
        self.engine.lock().await.is_fitted()
    }

    /// Ingest, build features, refit, score, explain and persist.
    pub async fn run_cycle(&self) -> Result<RefreshReport> {
        let mut engine = self.engine.lock().await;
        let started_at = Utc::now();

        let batch = self
            .source
            .fetch_batch()
            .await
            .with_context(|| format!("ingestion from {} failed", self.source.name()))?;

        let mut report = RefreshReport {
            source: self.source.name().to_string(),
            target: self.targets.name().to_string(),
            model_version: engine.model_version().to_string(),
            started_at,
            scored_at: None,
            news_events: batch.news.len(),
            expected_value: None,
            scores: Vec::new(),
        };

        if batch.structured.is_empty() {
            tracing::warn!("Refresh from {} returned no structured records", report.source);
            return Ok(report);
        }

        let mut issuer_ids: HashMap<String, i64> = HashMap::new();
        for record in &batch.structured {
            let issuer = self
                .store
                .get_or_create_issuer(&record.issuer, &record.asset_class)
                .await?;
            issuer_ids.insert(record.issuer.clone(), issuer.id);
        }

        if self.persist_news {
            for event in &batch.news {
                match issuer_ids.get(&event.issuer) {
                    Some(issuer_id) => {
                        self.store.record_news_event(*issuer_id, event).await?;
                    }
                    None => tracing::debug!("Skipping news for unknown issuer {}", event.issuer),
                }
            }
        }

        let rows = feature_builder::build_features(&batch.structured, &batch.news);
        let x = feature_builder::to_matrix(&rows);
        let y = self.targets.targets(&rows);

        engine.fit(&x, &y).map_err(CreditError::from)?;
        let predictions = engine.score(&x).map_err(CreditError::from)?;
        let explanation = engine.explain(&x).map_err(CreditError::from)?;

        let scored_at = Utc::now();
        for (i, row) in rows.iter().enumerate() {
            let issuer_id = issuer_ids
                .get(&row.issuer)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("No issuer id for {}", row.issuer))?;

            let attributions = FEATURE_NAMES
                .iter()
                .zip(row.values())
                .zip(explanation.row(i))
                .map(|((name, value), shap)| NewAttribution {
                    feature_name: name.to_string(),
                    feature_value: value,
                    shap_value: shap,
                })
                .collect();

            let saved = self
                .store
                .record_score(&NewCreditScore {
                    issuer_id,
                    ts: scored_at,
                    score: predictions[i],
                    model_version: engine.model_version().to_string(),
                    attributions,
                })
                .await?;

            report.scores.push(ScoredIssuer {
                issuer: row.issuer.clone(),
                issuer_id,
                score_id: saved.id,
                score: saved.score,
            });
        }

        report.scored_at = Some(scored_at);
        report.expected_value = Some(explanation.expected_value);

        tracing::info!(
            "Refresh cycle scored {} issuers from {} (model {}, target {})",
            report.scores.len(),
            report.source,
            report.model_version,
            report.target
        );

        Ok(report)
    }
}
