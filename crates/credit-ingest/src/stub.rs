use async_trait::async_trait;
use chrono::Utc;
use credit_core::{CreditError, DataSource, NewsEvent, StructuredRecord};

const STUB_NEWS_SOURCE: &str = "stub_news";

/// Fixed two-issuer feed used until live financials and news are wired in
#[derive(Debug, Default, Clone)]
pub struct StubDataSource;

impl StubDataSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DataSource for StubDataSource {
    fn name(&self) -> &str {
        "stub"
    }

    async fn fetch_structured(&self) -> Result<Vec<StructuredRecord>, CreditError> {
        let now = Utc::now();
        Ok(vec![
            StructuredRecord {
                issuer: "ABC Bank".to_string(),
                asset_class: "Financials".to_string(),
                revenue: 1200.0,
                debt: 300.0,
                cash: 200.0,
                date: now,
            },
            StructuredRecord {
                issuer: "XYZ Steel".to_string(),
                asset_class: "Materials".to_string(),
                revenue: 900.0,
                debt: 500.0,
                cash: 100.0,
                date: now,
            },
        ])
    }

    async fn fetch_news(&self) -> Result<Vec<NewsEvent>, CreditError> {
        let now = Utc::now();
        Ok(vec![
            NewsEvent {
                issuer: "ABC Bank".to_string(),
                source: STUB_NEWS_SOURCE.to_string(),
                headline: "Capital adequacy improves".to_string(),
                sentiment: 0.35,
                date: now,
            },
            NewsEvent {
                issuer: "XYZ Steel".to_string(),
                source: STUB_NEWS_SOURCE.to_string(),
                headline: "Input costs rising".to_string(),
                sentiment: -0.22,
                date: now,
            },
        ])
    }
}
