use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Issuer {
    pub id: i64,
    pub name: String,
    pub asset_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CreditScore {
    pub id: i64,
    pub issuer_id: i64,
    pub ts: DateTime<Utc>,
    pub score: f64,
    pub model_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeatureAttribution {
    pub id: i64,
    pub score_id: i64,
    pub feature_name: String,
    pub feature_value: f64,
    pub shap_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttribution {
    pub feature_name: String,
    pub feature_value: f64,
    pub shap_value: f64,
}

/// A score and its attributions, written together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCreditScore {
    pub issuer_id: i64,
    pub ts: DateTime<Utc>,
    pub score: f64,
    pub model_version: String,
    pub attributions: Vec<NewAttribution>,
}

/// Most recent score of one issuer, joined with the issuer
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LatestScore {
    pub issuer: String,
    pub asset_class: String,
    pub score: f64,
    pub ts: DateTime<Utc>,
    pub model_version: String,
    pub issuer_id: i64,
    pub score_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScorePoint {
    pub ts: DateTime<Utc>,
    pub score: f64,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionView {
    pub feature: String,
    pub value: f64,
    pub shap: f64,
}

impl From<FeatureAttribution> for AttributionView {
    fn from(row: FeatureAttribution) -> Self {
        Self {
            feature: row.feature_name,
            value: row.feature_value,
            shap: row.shap_value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NewsEventRecord {
    pub id: i64,
    pub issuer_id: i64,
    pub ts: DateTime<Utc>,
    pub source: String,
    /// JSON document with the headline and sentiment
    pub payload: String,
}

impl NewsEventRecord {
    pub fn payload_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_str(&self.payload)
    }
}
