//! Per-region capacity-factor forecasting.
//!
//! Joins the historical capacity-factor table with the aggregated
//! regional weather series, trains a probabilistic booster per column,
//! and writes one prediction table per configured quantile (plus a
//! clipped copy of each).

pub mod data;
pub mod forecaster;
pub mod metrics;

pub use data::{find_capfact_columns, parse_capfac_column, ForecastData};
pub use forecaster::{ColumnFailure, ForecastSummary, QuantileForecaster};
