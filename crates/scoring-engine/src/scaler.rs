use nalgebra::DMatrix;
use statrs::statistics::Statistics;

use crate::{ScoringError, ScoringResult};

/// Per-column centering and unit-variance scaling.
///
/// Uses the population standard deviation; a constant column is scaled by 1
/// so it maps to all zeros instead of NaN.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: &DMatrix<f64>) -> ScoringResult<Self> {
        if x.nrows() == 0 {
            return Err(ScoringError::InvalidTrainingSet(
                "cannot fit scaler on zero rows".to_string(),
            ));
        }

        let mut means = Vec::with_capacity(x.ncols());
        let mut scales = Vec::with_capacity(x.ncols());
        for column in x.column_iter() {
            let mean = column.iter().mean();
            let std = column.iter().population_std_dev();
            means.push(mean);
            scales.push(if std > 0.0 && std.is_finite() { std } else { 1.0 });
        }

        Ok(Self { means, scales })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn transform(&self, x: &DMatrix<f64>) -> ScoringResult<DMatrix<f64>> {
        if x.ncols() != self.n_features() {
            return Err(ScoringError::FeatureMismatch {
                expected: self.n_features(),
                actual: x.ncols(),
            });
        }

        Ok(DMatrix::from_fn(x.nrows(), x.ncols(), |i, j| {
            (x[(i, j)] - self.means[j]) / self.scales[j]
        }))
    }
}
