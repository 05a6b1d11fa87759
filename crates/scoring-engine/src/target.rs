use credit_core::{clamp_score, FeatureRow};

/// Supplies training labels for a batch of feature rows.
pub trait TargetProvider: Send + Sync {
    fn name(&self) -> &str;

    fn targets(&self, rows: &[FeatureRow]) -> Vec<f64>;
}

/// Heuristic stand-in for historical default / PD labels.
///
/// Lower leverage, more cash and better news push the label up. This is not a
/// validated relationship; swap in a provider backed by real outcomes once
/// one exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticTarget;

impl TargetProvider for SyntheticTarget {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn targets(&self, rows: &[FeatureRow]) -> Vec<f64> {
        rows.iter().map(synth_target).collect()
    }
}

pub fn synth_target(row: &FeatureRow) -> f64 {
    let base = 700.0 - 200.0 * row.debt_to_revenue
        + 150.0 * row.cash_ratio
        + 50.0 * row.news_sentiment
        + 0.05 * (row.revenue - row.debt).clamp(-500.0, 1500.0) / 10.0;
    clamp_score(base)
}
