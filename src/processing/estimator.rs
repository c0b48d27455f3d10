//! Best position estimate from a window of noisy fixes
//!
//! Fixes less precise than the accuracy threshold are discarded. The most
//! recent survivors are averaged on the unit sphere, each weighted by the
//! inverse of its accuracy variance and by an exponential recency decay.
//!
//! The result does not depend on the order fixes are supplied in: candidates
//! are sorted by `(timestamp, accuracy, latitude, longitude)` before the
//! window is taken and before summation.

use crate::core::{GeoPoint, PositionFix, DEFAULT_MAX_FIX_ACCURACY_M};
use log::{debug, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;

/// Default number of accepted fixes averaged into one estimate
pub const DEFAULT_ESTIMATOR_WINDOW: usize = 10;

/// Default recency half life (seconds)
pub const DEFAULT_RECENCY_HALF_LIFE_S: f64 = 5.0;

/// Default number of fixes kept by [`PositionEstimator`]
pub const DEFAULT_HISTORY_LEN: usize = 32;

/// Accuracy floor used when weighting (meters)
const MIN_WEIGHT_ACCURACY_M: f64 = 1.0;

/// Tuning for [`best_estimate`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorParams {
    /// Fixes with a larger accuracy radius are ignored (meters)
    pub max_accuracy_m: f64,
    /// Maximum number of accepted fixes combined
    pub window: usize,
    /// Age at which a fix's weight halves (seconds, <= 0 disables decay)
    pub recency_half_life_s: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            max_accuracy_m: DEFAULT_MAX_FIX_ACCURACY_M,
            window: DEFAULT_ESTIMATOR_WINDOW,
            recency_half_life_s: DEFAULT_RECENCY_HALF_LIFE_S,
        }
    }
}

/// Observer position used as the placement origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BestEstimate {
    pub point: GeoPoint,
    /// Number of fixes combined into `point`
    pub fixes_used: usize,
    /// True when no fix met the accuracy threshold and the latest raw fix
    /// was returned instead
    pub degraded: bool,
    /// Timestamp of the newest fix considered
    pub timestamp_ms: u64,
}

fn chronological(a: &PositionFix, b: &PositionFix) -> Ordering {
    a.timestamp_ms
        .cmp(&b.timestamp_ms)
        .then_with(|| b.horizontal_accuracy_m.total_cmp(&a.horizontal_accuracy_m))
        .then_with(|| a.point.latitude().total_cmp(&b.point.latitude()))
        .then_with(|| a.point.longitude().total_cmp(&b.point.longitude()))
}

impl EstimatorParams {
    /// Whether `fix` is precise enough to contribute to an estimate
    pub fn accepts(&self, fix: &PositionFix) -> bool {
        fix.horizontal_accuracy_m.is_finite()
            && fix.horizontal_accuracy_m > 0.0
            && fix.horizontal_accuracy_m <= self.max_accuracy_m
    }
}

fn weight(fix: &PositionFix, latest_ms: u64, half_life_s: f64) -> f64 {
    let accuracy = fix.horizontal_accuracy_m.max(MIN_WEIGHT_ACCURACY_M);
    let mut w = 1.0 / (accuracy * accuracy);
    if half_life_s > 0.0 {
        let age_s = latest_ms.saturating_sub(fix.timestamp_ms) as f64 / 1000.0;
        w *= 0.5_f64.powf(age_s / half_life_s);
    }
    w
}

/// Combine `fixes` into one position; `None` only when `fixes` is empty
pub fn best_estimate(fixes: &[PositionFix], params: &EstimatorParams) -> Option<BestEstimate> {
    let latest_raw = fixes.iter().max_by(|a, b| chronological(a, b))?;

    let mut trusted: Vec<&PositionFix> = fixes
        .iter()
        .filter(|fix| params.accepts(fix))
        .collect();

    if trusted.is_empty() {
        warn!(
            "No fix within {} m accuracy, falling back to latest raw fix ({} m)",
            params.max_accuracy_m, latest_raw.horizontal_accuracy_m
        );
        return Some(BestEstimate {
            point: latest_raw.point,
            fixes_used: 1,
            degraded: true,
            timestamp_ms: latest_raw.timestamp_ms,
        });
    }

    trusted.sort_by(|a, b| chronological(a, b));
    let window = params.window.max(1);
    let recent = &trusted[trusted.len().saturating_sub(window)..];
    let newest = recent[recent.len() - 1];

    let sum = recent.iter().fold(Vector3::zeros(), |acc: Vector3<f64>, fix| {
        acc + fix.point.to_unit_vector() * weight(fix, newest.timestamp_ms, params.recency_half_life_s)
    });

    // Weights cancel only for near-antipodal fixes; keep the newest one
    let point = if sum.norm() > f64::EPSILON {
        GeoPoint::from_unit_vector(&sum)
    } else {
        newest.point
    };

    debug!("Best estimate {} from {} fixes", point, recent.len());
    Some(BestEstimate {
        point,
        fixes_used: recent.len(),
        degraded: false,
        timestamp_ms: newest.timestamp_ms,
    })
}

/// Bounded fix history feeding [`best_estimate`]
#[derive(Debug, Clone)]
pub struct PositionEstimator {
    params: EstimatorParams,
    history: VecDeque<PositionFix>,
    capacity: usize,
}

impl Default for PositionEstimator {
    fn default() -> Self {
        Self::new(EstimatorParams::default(), DEFAULT_HISTORY_LEN)
    }
}

impl PositionEstimator {
    pub fn new(params: EstimatorParams, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            params,
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a fix, evicting the oldest once the history is full
    pub fn push(&mut self, fix: PositionFix) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(fix);
    }

    /// Current estimate over the recorded history
    pub fn estimate(&self) -> Option<BestEstimate> {
        let fixes: Vec<PositionFix> = self.history.iter().copied().collect();
        best_estimate(&fixes, &self.params)
    }

    pub fn params(&self) -> &EstimatorParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}
