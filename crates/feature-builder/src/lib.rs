//! Feature construction
//!
//! Joins one cycle's structured financials with its news events and derives
//! the ratio features the scoring engine is trained on. Degenerate ratios are
//! replaced by zero rather than reported, so every row is always finite in
//! `debt_to_revenue` and `news_sentiment`.

use credit_core::{FeatureRow, NewsEvent, StructuredRecord, FEATURE_COUNT};
use nalgebra::DMatrix;
use std::collections::HashMap;

/// Added to debt before dividing cash by it.
pub const CASH_RATIO_EPSILON: f64 = 1e-6;

/// Mean sentiment per issuer across every supplied news event.
pub fn aggregate_sentiment(news: &[NewsEvent]) -> HashMap<String, f64> {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for event in news {
        let entry = sums.entry(event.issuer.as_str()).or_insert((0.0, 0));
        entry.0 += event.sentiment;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|(issuer, (sum, count))| (issuer.to_string(), sum / count as f64))
        .collect()
}

/// `debt / revenue`, or zero when the division is undefined or not finite.
pub fn debt_to_revenue(debt: f64, revenue: f64) -> f64 {
    if revenue == 0.0 {
        return 0.0;
    }
    let ratio = debt / revenue;
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

/// `cash / (debt + ε)`; intentionally unbounded.
pub fn cash_ratio(cash: f64, debt: f64) -> f64 {
    cash / (debt + CASH_RATIO_EPSILON)
}

/// One feature row per structured record, in input order.
///
/// News for issuers that are not in `structured` is ignored.
pub fn build_features(structured: &[StructuredRecord], news: &[NewsEvent]) -> Vec<FeatureRow> {
    let sentiment = aggregate_sentiment(news);

    let rows: Vec<FeatureRow> = structured
        .iter()
        .map(|record| FeatureRow {
            issuer: record.issuer.clone(),
            asset_class: record.asset_class.clone(),
            revenue: record.revenue,
            debt: record.debt,
            cash: record.cash,
            debt_to_revenue: debt_to_revenue(record.debt, record.revenue),
            cash_ratio: cash_ratio(record.cash, record.debt),
            news_sentiment: sentiment.get(&record.issuer).copied().unwrap_or(0.0),
        })
        .collect();

    tracing::debug!(
        "Built {} feature rows ({} issuers with news)",
        rows.len(),
        sentiment.len()
    );

    rows
}

/// Stack feature rows into an `n x 6` matrix in `FEATURE_NAMES` column order.
pub fn to_matrix(rows: &[FeatureRow]) -> DMatrix<f64> {
    let data: Vec<f64> = rows.iter().flat_map(|r| r.values()).collect();
    DMatrix::from_row_slice(rows.len(), FEATURE_COUNT, &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Utc;

    fn record(issuer: &str, revenue: f64, debt: f64, cash: f64) -> StructuredRecord {
        StructuredRecord {
            issuer: issuer.to_string(),
            asset_class: "Financials".to_string(),
            revenue,
            debt,
            cash,
            date: Utc::now(),
        }
    }

    fn news(issuer: &str, sentiment: f64) -> NewsEvent {
        NewsEvent {
            issuer: issuer.to_string(),
            source: "test".to_string(),
            headline: "headline".to_string(),
            sentiment,
            date: Utc::now(),
        }
    }

    #[test]
    fn test_zero_revenue_gives_zero_debt_ratio() {
        let rows = build_features(
            &[record("A", 0.0, 300.0, 10.0), record("B", 0.0, 0.0, 10.0), record("C", 0.0, -5.0, 1.0)],
            &[],
        );
        for row in &rows {
            assert_eq!(row.debt_to_revenue, 0.0);
        }
    }

    #[test]
    fn test_non_finite_ratio_is_zeroed() {
        assert_eq!(debt_to_revenue(f64::MAX, 1e-300), 0.0);
        assert_eq!(debt_to_revenue(f64::NAN, 10.0), 0.0);
        assert_relative_eq!(debt_to_revenue(300.0, 1200.0), 0.25);
    }

    #[test]
    fn test_missing_news_gives_zero_sentiment() {
        let rows = build_features(&[record("Quiet Corp", 100.0, 10.0, 5.0)], &[news("Other", 0.9)]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].news_sentiment, 0.0);
    }

    #[test]
    fn test_sentiment_is_averaged() {
        let rows = build_features(
            &[record("ABC Bank", 1200.0, 300.0, 200.0)],
            &[news("ABC Bank", 0.5), news("ABC Bank", -0.1), news("ABC Bank", 0.2)],
        );
        assert_relative_eq!(rows[0].news_sentiment, 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_cash_ratio_with_zero_debt() {
        let rows = build_features(&[record("Cash Rich", 50.0, 0.0, 100.0)], &[]);
        assert_eq!(rows[0].cash_ratio, 100.0 / CASH_RATIO_EPSILON);
        assert!(rows[0].cash_ratio.is_finite());
    }

    #[test]
    fn test_matrix_layout() {
        let rows = build_features(
            &[record("A", 1200.0, 300.0, 200.0), record("B", 900.0, 500.0, 100.0)],
            &[news("A", 0.35)],
        );
        let x = to_matrix(&rows);
        assert_eq!(x.nrows(), 2);
        assert_eq!(x.ncols(), FEATURE_COUNT);
        assert_eq!(x[(0, 0)], 1200.0);
        assert_eq!(x[(1, 1)], 500.0);
        assert_relative_eq!(x[(0, 3)], 0.25);
        assert_eq!(x[(0, 5)], 0.35);
        assert_eq!(x[(1, 5)], 0.0);
    }
}
