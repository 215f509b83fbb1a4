//! Probabilistic regression for the forecasting stage: a natural-gradient
//! booster over Normal predictive distributions, plus the seeded data
//! splits and cross-validated hyperparameter search built on top of it.

pub mod booster;
pub mod dist;
pub mod matrix;
pub mod search;
pub mod split;
pub mod tree;

pub use booster::{BoosterParams, NormalBooster};
pub use dist::PredictiveDistribution;
pub use matrix::FeatureMatrix;
pub use search::{grid_search, ParamGrid, SearchOutcome};
pub use split::train_test_split;
