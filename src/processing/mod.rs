//! Position fix processing

pub mod estimator;

pub use estimator::{best_estimate, BestEstimate, EstimatorParams, PositionEstimator};
