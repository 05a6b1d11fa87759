use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric feature columns, in the only order the scoring engine accepts.
pub const FEATURE_NAMES: [&str; 6] = [
    "revenue",
    "debt",
    "cash",
    "debt_to_revenue",
    "cash_ratio",
    "news_sentiment",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Lowest score a model may emit.
pub const MIN_SCORE: f64 = 300.0;
/// Highest score a model may emit.
pub const MAX_SCORE: f64 = 900.0;

/// Clamp a raw model output into the published score range.
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(MIN_SCORE, MAX_SCORE)
}

/// Per-issuer financial snapshot for one refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub issuer: String,
    pub asset_class: String,
    pub revenue: f64,
    pub debt: f64,
    pub cash: f64,
    pub date: DateTime<Utc>,
}

/// Headline with a sentiment value in [-1, 1]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsEvent {
    pub issuer: String,
    #[serde(default = "default_news_source")]
    pub source: String,
    pub headline: String,
    pub sentiment: f64,
    pub date: DateTime<Utc>,
}

fn default_news_source() -> String {
    "unknown".to_string()
}

/// Everything one ingestion pass produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionBatch {
    pub structured: Vec<StructuredRecord>,
    #[serde(default)]
    pub news: Vec<NewsEvent>,
}

/// Model input for one issuer in one refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub issuer: String,
    pub asset_class: String,
    pub revenue: f64,
    pub debt: f64,
    pub cash: f64,
    pub debt_to_revenue: f64,
    pub cash_ratio: f64,
    pub news_sentiment: f64,
}

impl FeatureRow {
    /// Numeric features in `FEATURE_NAMES` order
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            self.revenue,
            self.debt,
            self.cash,
            self.debt_to_revenue,
            self.cash_ratio,
            self.news_sentiment,
        ]
    }
}
