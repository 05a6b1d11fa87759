use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::tree::{RegressionTree, TreeParams};
use crate::{ScoringError, ScoringResult};

/// Random forest hyper-parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    /// Seed for bootstrap sampling; the same seed and data give the same forest
    pub random_state: u64,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            random_state: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl ForestConfig {
    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split.max(2),
            min_samples_leaf: self.min_samples_leaf.max(1),
        }
    }
}

/// Bagged ensemble of regression trees; predictions are the tree average.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForestRegressor {
    pub fn fit(config: &ForestConfig, x: &DMatrix<f64>, y: &[f64]) -> ScoringResult<Self> {
        let n = x.nrows();
        if n == 0 {
            return Err(ScoringError::InvalidTrainingSet("no training rows".to_string()));
        }
        if y.len() != n {
            return Err(ScoringError::InvalidTrainingSet(format!(
                "{} rows but {} targets",
                n,
                y.len()
            )));
        }
        if config.n_estimators == 0 {
            return Err(ScoringError::InvalidTrainingSet(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if y.iter().any(|v| !v.is_finite()) || x.iter().any(|v| !v.is_finite()) {
            return Err(ScoringError::InvalidTrainingSet(
                "training data contains non-finite values".to_string(),
            ));
        }

        let params = config.tree_params();
        let mut rng = StdRng::seed_from_u64(config.random_state);
        let mut trees = Vec::with_capacity(config.n_estimators);

        for _ in 0..config.n_estimators {
            let mut samples: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(RegressionTree::fit(x, y, &mut samples, &params));
        }

        tracing::debug!(
            "Fitted random forest: {} trees on {} rows x {} features",
            trees.len(),
            n,
            x.ncols()
        );

        Ok(Self {
            trees,
            n_features: x.ncols(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn predict(&self, x: &DMatrix<f64>) -> Vec<f64> {
        rows(x).map(|row| self.predict_row(&row)).collect()
    }

    /// Baseline the attributions are measured against
    pub fn expected_value(&self) -> f64 {
        self.trees.iter().map(RegressionTree::expected_value).sum::<f64>() / self.trees.len() as f64
    }

    /// Exact TreeSHAP attributions for one row, averaged over the ensemble.
    pub fn shap_row(&self, row: &[f64]) -> Vec<f64> {
        let mut phi = vec![0.0; self.n_features];
        for tree in &self.trees {
            tree.accumulate_shap(row, &mut phi);
        }
        let n = self.trees.len() as f64;
        phi.iter_mut().for_each(|v| *v /= n);
        phi
    }
}

pub(crate) fn rows(x: &DMatrix<f64>) -> impl Iterator<Item = Vec<f64>> + '_ {
    x.row_iter().map(|r| r.iter().copied().collect())
}
