use crate::db::CreditDb;
use crate::models::*;
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use credit_core::{clamp_score, CreditError, NewsEvent};
use std::collections::HashSet;

/// Fixed-width UTC timestamps so TEXT ordering is chronological ordering
fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn db_error(err: sqlx::Error) -> CreditError {
    CreditError::Database(err.to_string())
}

#[derive(Clone)]
pub struct CreditStore {
    db: CreditDb,
}

impl CreditStore {
    pub fn new(db: CreditDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &CreditDb {
        &self.db
    }

    /// List every issuer
    pub async fn list_issuers(&self) -> Result<Vec<Issuer>> {
        let issuers = sqlx::query_as::<_, Issuer>("SELECT id, name, asset_class FROM issuers ORDER BY id")
            .fetch_all(self.db.pool())
            .await
            .map_err(db_error)?;

        Ok(issuers)
    }

    pub async fn get_issuer(&self, id: i64) -> Result<Option<Issuer>> {
        let issuer = sqlx::query_as::<_, Issuer>("SELECT id, name, asset_class FROM issuers WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(db_error)?;

        Ok(issuer)
    }

    pub async fn find_issuer_by_name(&self, name: &str) -> Result<Option<Issuer>> {
        let issuer = sqlx::query_as::<_, Issuer>("SELECT id, name, asset_class FROM issuers WHERE name = ?")
            .bind(name)
            .fetch_optional(self.db.pool())
            .await
            .map_err(db_error)?;

        Ok(issuer)
    }

    /// Return the issuer called `name`, creating it on first sight.
    ///
    /// An existing issuer keeps its original asset class.
    pub async fn get_or_create_issuer(&self, name: &str, asset_class: &str) -> Result<Issuer> {
        sqlx::query("INSERT INTO issuers (name, asset_class) VALUES (?, ?) ON CONFLICT(name) DO NOTHING")
            .bind(name)
            .bind(asset_class)
            .execute(self.db.pool())
            .await
            .map_err(db_error)?;

        self.find_issuer_by_name(name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Issuer vanished after insert: {}", name))
    }

    /// Append a score and all of its attributions in one transaction
    pub async fn record_score(&self, new: &NewCreditScore) -> Result<CreditScore> {
        let mut tx = self.db.pool().begin().await.map_err(db_error)?;

        let (score_id,): (i64,) = sqlx::query_as(
            "INSERT INTO credit_scores (issuer_id, ts, score, model_version) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(new.issuer_id)
        .bind(encode_ts(&new.ts))
        .bind(clamp_score(new.score))
        .bind(&new.model_version)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        for attribution in &new.attributions {
            sqlx::query(
                r#"
                INSERT INTO feature_attributions (score_id, feature_name, feature_value, shap_value)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(score_id)
            .bind(&attribution.feature_name)
            .bind(attribution.feature_value)
            .bind(attribution.shap_value)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        let score = sqlx::query_as::<_, CreditScore>(
            "SELECT id, issuer_id, ts, score, model_version FROM credit_scores WHERE id = ?",
        )
        .bind(score_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(score)
    }

    pub async fn get_score(&self, id: i64) -> Result<Option<CreditScore>> {
        let score = sqlx::query_as::<_, CreditScore>(
            "SELECT id, issuer_id, ts, score, model_version FROM credit_scores WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(db_error)?;

        Ok(score)
    }

    /// Delete a score; its attributions go with it
    pub async fn delete_score(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM credit_scores WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn score_count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(id) FROM credit_scores")
            .fetch_one(self.db.pool())
            .await
            .map_err(db_error)?;

        Ok(count)
    }

    /// Latest score per issuer, newest first, optionally for one asset class
    pub async fn latest_scores(&self, asset_class: Option<&str>) -> Result<Vec<LatestScore>> {
        let rows = sqlx::query_as::<_, LatestScore>(
            r#"
            SELECT i.name AS issuer, i.asset_class AS asset_class, s.score AS score, s.ts AS ts,
                   s.model_version AS model_version, s.issuer_id AS issuer_id, s.id AS score_id
            FROM credit_scores s
            JOIN issuers i ON i.id = s.issuer_id
            WHERE ? IS NULL OR i.asset_class = ?
            ORDER BY s.ts DESC, s.id DESC
            "#,
        )
        .bind(asset_class)
        .bind(asset_class)
        .fetch_all(self.db.pool())
        .await
        .map_err(db_error)?;

        let mut seen = HashSet::new();
        Ok(rows
            .into_iter()
            .filter(|row| seen.insert(row.issuer_id))
            .collect())
    }

    /// Every score of one issuer, oldest first
    pub async fn score_history(&self, issuer_id: i64) -> Result<Vec<ScorePoint>> {
        let points = sqlx::query_as::<_, ScorePoint>(
            "SELECT ts, score, id FROM credit_scores WHERE issuer_id = ? ORDER BY ts ASC, id ASC",
        )
        .bind(issuer_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(db_error)?;

        Ok(points)
    }

    /// Attributions of one score in insertion order
    pub async fn attributions(&self, score_id: i64) -> Result<Vec<FeatureAttribution>> {
        let rows = sqlx::query_as::<_, FeatureAttribution>(
            r#"
            SELECT id, score_id, feature_name, feature_value, shap_value
            FROM feature_attributions
            WHERE score_id = ?
            ORDER BY id
            "#,
        )
        .bind(score_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(db_error)?;

        Ok(rows)
    }

    /// The `limit` largest attributions by absolute weight. Equal magnitudes
    /// keep insertion order.
    pub async fn top_attributions(&self, score_id: i64, limit: usize) -> Result<Vec<AttributionView>> {
        let mut rows = self.attributions(score_id).await?;
        // sort_by is stable
        rows.sort_by(|a, b| b.shap_value.abs().total_cmp(&a.shap_value.abs()));
        rows.truncate(limit);

        Ok(rows.into_iter().map(AttributionView::from).collect())
    }

    /// Keep a news event for audit
    pub async fn record_news_event(&self, issuer_id: i64, event: &NewsEvent) -> Result<i64> {
        let payload = serde_json::json!({
            "headline": event.headline,
            "sentiment": event.sentiment,
            "issuer": event.issuer,
        });

        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO news_events (issuer_id, ts, source, payload) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(issuer_id)
        .bind(encode_ts(&event.date))
        .bind(&event.source)
        .bind(payload.to_string())
        .fetch_one(self.db.pool())
        .await
        .map_err(db_error)?;

        Ok(id)
    }

    pub async fn news_events(&self, issuer_id: i64) -> Result<Vec<NewsEventRecord>> {
        let rows = sqlx::query_as::<_, NewsEventRecord>(
            "SELECT id, issuer_id, ts, source, payload FROM news_events WHERE issuer_id = ? ORDER BY ts, id",
        )
        .bind(issuer_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(db_error)?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn setup_test_store() -> CreditStore {
        CreditStore::new(CreditDb::new("sqlite::memory:").await.unwrap())
    }

    fn attribution(name: &str, value: f64, shap: f64) -> NewAttribution {
        NewAttribution {
            feature_name: name.to_string(),
            feature_value: value,
            shap_value: shap,
        }
    }

    fn new_score(issuer_id: i64, ts: DateTime<Utc>, score: f64) -> NewCreditScore {
        NewCreditScore {
            issuer_id,
            ts,
            score,
            model_version: "rf-1.0".to_string(),
            attributions: vec![attribution("revenue", 1200.0, 4.0)],
        }
    }

    #[tokio::test]
    async fn test_get_or_create_issuer_is_idempotent() {
        let store = setup_test_store().await;

        let first = store.get_or_create_issuer("ABC Bank", "Financials").await.unwrap();
        let second = store.get_or_create_issuer("ABC Bank", "Materials").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(second.asset_class, "Financials");

        store.get_or_create_issuer("XYZ Steel", "Materials").await.unwrap();
        assert_eq!(store.list_issuers().await.unwrap().len(), 2);
        assert!(store.get_issuer(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_scores_one_per_issuer() {
        let store = setup_test_store().await;
        let abc = store.get_or_create_issuer("ABC Bank", "Financials").await.unwrap();
        let xyz = store.get_or_create_issuer("XYZ Steel", "Materials").await.unwrap();

        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
        let t1 = t0 + Duration::hours(1);

        // newer row inserted first to make sure ordering comes from ts
        let abc_new = store.record_score(&new_score(abc.id, t1, 780.0)).await.unwrap();
        store.record_score(&new_score(abc.id, t0, 760.0)).await.unwrap();
        store.record_score(&new_score(xyz.id, t0, 610.0)).await.unwrap();
        let xyz_new = store.record_score(&new_score(xyz.id, t1, 605.0)).await.unwrap();

        let latest = store.latest_scores(None).await.unwrap();
        assert_eq!(latest.len(), 2);
        let abc_latest = latest.iter().find(|s| s.issuer == "ABC Bank").unwrap();
        assert_eq!(abc_latest.score_id, abc_new.id);
        assert_eq!(abc_latest.ts, t1);
        let xyz_latest = latest.iter().find(|s| s.issuer == "XYZ Steel").unwrap();
        assert_eq!(xyz_latest.score_id, xyz_new.id);

        let materials = store.latest_scores(Some("Materials")).await.unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].issuer_id, xyz.id);
        assert!(store.latest_scores(Some("Energy")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_latest_scores_same_ts_prefers_higher_id() {
        let store = setup_test_store().await;
        let abc = store.get_or_create_issuer("ABC Bank", "Financials").await.unwrap();
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        store.record_score(&new_score(abc.id, t0, 700.0)).await.unwrap();
        let second = store.record_score(&new_score(abc.id, t0, 710.0)).await.unwrap();

        let latest = store.latest_scores(None).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].score_id, second.id);
    }

    #[tokio::test]
    async fn test_score_history_ascending() {
        let store = setup_test_store().await;
        let abc = store.get_or_create_issuer("ABC Bank", "Financials").await.unwrap();
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();

        for (offset, score) in [(2, 700.0), (0, 650.0), (1, 675.0)] {
            store
                .record_score(&new_score(abc.id, t0 + Duration::days(offset), score))
                .await
                .unwrap();
        }

        let history = store.score_history(abc.id).await.unwrap();
        let scores: Vec<f64> = history.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![650.0, 675.0, 700.0]);
        assert!(store.score_history(abc.id + 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scores_are_clamped() {
        let store = setup_test_store().await;
        let abc = store.get_or_create_issuer("ABC Bank", "Financials").await.unwrap();
        let low = store.record_score(&new_score(abc.id, Utc::now(), 12.0)).await.unwrap();
        let high = store.record_score(&new_score(abc.id, Utc::now(), 1e6)).await.unwrap();
        assert_eq!(low.score, 300.0);
        assert_eq!(high.score, 900.0);
    }

    #[tokio::test]
    async fn test_top_attributions_by_magnitude_stable() {
        let store = setup_test_store().await;
        let abc = store.get_or_create_issuer("ABC Bank", "Financials").await.unwrap();
        let mut score = new_score(abc.id, Utc::now(), 700.0);
        score.attributions = vec![
            attribution("revenue", 1200.0, 1.0),
            attribution("debt", 300.0, -5.0),
            attribution("cash", 200.0, 5.0),
            attribution("debt_to_revenue", 0.25, 0.5),
            attribution("cash_ratio", 0.66, -5.0),
            attribution("news_sentiment", 0.35, 2.0),
        ];
        let saved = store.record_score(&score).await.unwrap();

        let top = store.top_attributions(saved.id, 4).await.unwrap();
        let names: Vec<&str> = top.iter().map(|a| a.feature.as_str()).collect();
        assert_eq!(names, vec!["debt", "cash", "cash_ratio", "news_sentiment"]);
        assert_eq!(top[0].value, 300.0);
        assert_eq!(top[0].shap, -5.0);

        assert_eq!(store.top_attributions(saved.id, 8).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_delete_score_cascades() {
        let store = setup_test_store().await;
        let abc = store.get_or_create_issuer("ABC Bank", "Financials").await.unwrap();
        let saved = store.record_score(&new_score(abc.id, Utc::now(), 700.0)).await.unwrap();
        assert_eq!(store.attributions(saved.id).await.unwrap().len(), 1);
        assert_eq!(store.score_count().await.unwrap(), 1);

        assert!(store.delete_score(saved.id).await.unwrap());
        assert!(store.attributions(saved.id).await.unwrap().is_empty());
        assert_eq!(store.score_count().await.unwrap(), 0);
        assert!(!store.delete_score(saved.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_record_score_rejects_unknown_issuer() {
        let store = setup_test_store().await;
        let err = store
            .record_score(&new_score(42, Utc::now(), 700.0))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CreditError>(),
            Some(CreditError::Database(_))
        ));
        assert_eq!(store.score_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_news_event_audit() {
        let store = setup_test_store().await;
        let abc = store.get_or_create_issuer("ABC Bank", "Financials").await.unwrap();
        let event = NewsEvent {
            issuer: "ABC Bank".to_string(),
            source: "stub_news".to_string(),
            headline: "Capital adequacy improves".to_string(),
            sentiment: 0.35,
            date: Utc::now(),
        };
        store.record_news_event(abc.id, &event).await.unwrap();

        let events = store.news_events(abc.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, "stub_news");
        let payload = events[0].payload_json().unwrap();
        assert_eq!(payload["headline"], "Capital adequacy improves");
    }
}
