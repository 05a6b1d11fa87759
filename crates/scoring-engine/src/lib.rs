//! Credit scoring model
//!
//! A standard-scaled random forest regressor with exact TreeSHAP attributions,
//! plus the placeholder target used to train it while no historical outcome
//! data exists.

mod engine;
mod error;
mod forest;
mod scaler;
mod target;
mod tree;
mod tree_shap;

pub use engine::{Explanation, ScoringEngine, MODEL_VERSION};
pub use error::{ScoringError, ScoringResult};
pub use forest::{ForestConfig, RandomForestRegressor};
pub use scaler::StandardScaler;
pub use target::{synth_target, SyntheticTarget, TargetProvider};
pub use tree::RegressionTree;
