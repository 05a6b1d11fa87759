use nalgebra::DMatrix;

use crate::forest::rows;
use crate::{ForestConfig, RandomForestRegressor, ScoringError, ScoringResult, StandardScaler};

/// Tag persisted with every score this engine produces
pub const MODEL_VERSION: &str = "rf-1.0";

/// Per-row feature attributions and the baseline they are relative to
#[derive(Debug, Clone)]
pub struct Explanation {
    pub expected_value: f64,
    /// `n_rows x n_features`, same column order as the scored matrix
    pub contributions: DMatrix<f64>,
}

impl Explanation {
    pub fn row(&self, index: usize) -> Vec<f64> {
        self.contributions.row(index).iter().copied().collect()
    }

    /// Baseline plus the row's attributions; equals the model prediction.
    pub fn reconstruct(&self, index: usize) -> f64 {
        self.expected_value + self.contributions.row(index).sum()
    }
}

/// Scaler + random forest, refit wholesale on every `fit`.
///
/// Not synchronized; owners that share it across tasks must serialize access.
#[derive(Debug)]
pub struct ScoringEngine {
    config: ForestConfig,
    scaler: Option<StandardScaler>,
    model: Option<RandomForestRegressor>,
    model_version: String,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ForestConfig::default())
    }
}

impl ScoringEngine {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            scaler: None,
            model: None,
            model_version: MODEL_VERSION.to_string(),
        }
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.scaler.is_some() && self.model.is_some()
    }

    /// Fit the scaler on `x`, then the forest on the scaled matrix.
    pub fn fit(&mut self, x: &DMatrix<f64>, y: &[f64]) -> ScoringResult<()> {
        let scaler = StandardScaler::fit(x)?;
        let scaled = scaler.transform(x)?;
        let model = RandomForestRegressor::fit(&self.config, &scaled, y)?;

        tracing::info!(
            "Scoring engine {} fitted on {} rows ({} trees)",
            self.model_version,
            x.nrows(),
            model.trees().len()
        );

        self.scaler = Some(scaler);
        self.model = Some(model);
        Ok(())
    }

    fn fitted(&self) -> ScoringResult<(&StandardScaler, &RandomForestRegressor)> {
        match (&self.scaler, &self.model) {
            (Some(scaler), Some(model)) => Ok((scaler, model)),
            _ => Err(ScoringError::ModelNotFitted),
        }
    }

    /// Point prediction per row
    pub fn score(&self, x: &DMatrix<f64>) -> ScoringResult<Vec<f64>> {
        let (scaler, model) = self.fitted()?;
        let scaled = scaler.transform(x)?;
        Ok(model.predict(&scaled))
    }

    pub fn explain(&self, x: &DMatrix<f64>) -> ScoringResult<Explanation> {
        let (scaler, model) = self.fitted()?;
        let scaled = scaler.transform(x)?;

        let mut contributions = DMatrix::zeros(scaled.nrows(), scaled.ncols());
        for (i, row) in rows(&scaled).enumerate() {
            for (j, value) in model.shap_row(&row).into_iter().enumerate() {
                contributions[(i, j)] = value;
            }
        }

        Ok(Explanation {
            expected_value: model.expected_value(),
            contributions,
        })
    }
}
