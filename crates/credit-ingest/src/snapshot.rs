use async_trait::async_trait;
use credit_core::{CreditError, DataSource, IngestionBatch, NewsEvent, StructuredRecord};
use std::path::{Path, PathBuf};

/// Serves a batch that was handed over up front
#[derive(Debug, Clone)]
pub struct StaticSource {
    label: String,
    batch: IngestionBatch,
}

impl StaticSource {
    pub fn new(label: impl Into<String>, batch: IngestionBatch) -> Self {
        Self {
            label: label.into(),
            batch,
        }
    }
}

#[async_trait]
impl DataSource for StaticSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch_structured(&self) -> Result<Vec<StructuredRecord>, CreditError> {
        Ok(self.batch.structured.clone())
    }

    async fn fetch_news(&self) -> Result<Vec<NewsEvent>, CreditError> {
        Ok(self.batch.news.clone())
    }
}

/// Reads a JSON file shaped like `{"structured": [...], "news": [...]}`.
///
/// The file is re-read on every fetch so an external exporter can replace it
/// between refresh cycles. A record missing a required field, or a news
/// sentiment outside [-1, 1], fails the whole fetch.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    path: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn load(&self) -> Result<IngestionBatch, CreditError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CreditError::Ingestion(format!("failed to read {}: {}", self.path.display(), e))
        })?;
        let batch: IngestionBatch = serde_json::from_str(&raw).map_err(|e| {
            CreditError::Ingestion(format!("malformed snapshot {}: {}", self.path.display(), e))
        })?;
        if let Some(event) = batch
            .news
            .iter()
            .find(|n| !(-1.0..=1.0).contains(&n.sentiment))
        {
            return Err(CreditError::Ingestion(format!(
                "sentiment {} for {} in {} is outside [-1, 1]",
                event.sentiment,
                event.issuer,
                self.path.display()
            )));
        }
        tracing::debug!(
            "Loaded snapshot {} ({} structured, {} news)",
            self.path.display(),
            batch.structured.len(),
            batch.news.len()
        );
        Ok(batch)
    }
}

#[async_trait]
impl DataSource for JsonSnapshotSource {
    fn name(&self) -> &str {
        "json_snapshot"
    }

    async fn fetch_structured(&self) -> Result<Vec<StructuredRecord>, CreditError> {
        Ok(self.load().await?.structured)
    }

    async fn fetch_news(&self) -> Result<Vec<NewsEvent>, CreditError> {
        Ok(self.load().await?.news)
    }

    async fn fetch_batch(&self) -> Result<IngestionBatch, CreditError> {
        self.load().await
    }
}
