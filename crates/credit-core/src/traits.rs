use async_trait::async_trait;
use crate::{CreditError, IngestionBatch, NewsEvent, StructuredRecord};

/// A feed of issuer financials and news for one refresh cycle
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short label used in logs and persisted audit rows
    fn name(&self) -> &str;

    async fn fetch_structured(&self) -> Result<Vec<StructuredRecord>, CreditError>;

    async fn fetch_news(&self) -> Result<Vec<NewsEvent>, CreditError>;

    async fn fetch_batch(&self) -> Result<IngestionBatch, CreditError> {
        Ok(IngestionBatch {
            structured: self.fetch_structured().await?,
            news: self.fetch_news().await?,
        })
    }
}
