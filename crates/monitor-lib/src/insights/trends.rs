//! Trend analysis
//!
//! Fits a least-squares line over the most recent values of a metric and
//! classifies its direction.

use crate::alerts::WatchedRule;
use crate::config::TrendConfig;
use crate::models::{Trend, TrendDirection};
use crate::store::MetricsStore;
use chrono::{DateTime, Utc};

/// Linear-regression trend analysis over recent values
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    /// Most recent values fitted
    pub window: usize,
    /// Change across the window below this fraction of |mean| is stable
    pub stable_ratio: f64,
}

impl TrendAnalyzer {
    pub fn new(window: usize, stable_ratio: f64) -> Self {
        Self {
            window: window.max(2),
            stable_ratio: stable_ratio.max(0.0),
        }
    }

    pub fn from_config(config: &TrendConfig) -> Self {
        Self::new(config.window, config.stable_ratio)
    }

    /// Trend of every watched metric that has at least two points
    pub fn analyze_all(&self, store: &MetricsStore, watched: &[WatchedRule]) -> Vec<Trend> {
        watched
            .iter()
            .filter_map(|rule| {
                let points = store
                    .history(&rule.collector)?
                    .recent_points(&rule.metric, self.window);
                self.analyze(&rule.collector, &rule.metric.to_string(), &points)
            })
            .collect()
    }

    /// Fit `points` (oldest first)
    pub fn analyze(
        &self,
        collector: &str,
        metric: &str,
        points: &[(DateTime<Utc>, f64)],
    ) -> Option<Trend> {
        if points.len() < 2 {
            return None;
        }

        let t0 = points.first()?.0;
        let samples: Vec<(f64, f64)> = points
            .iter()
            .map(|(ts, v)| (seconds_between(t0, *ts), *v))
            .collect();

        let slope = linear_regression_slope(&samples);
        let r_squared = r_squared(&samples, slope);

        let span = samples.last().map(|(x, _)| *x).unwrap_or(0.0);
        let mean = samples.iter().map(|(_, y)| y).sum::<f64>() / samples.len() as f64;
        let change = slope * span;

        let direction = if change.abs() < f64::EPSILON
            || change.abs() < self.stable_ratio * mean.abs()
        {
            TrendDirection::Stable
        } else if change > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        };

        Some(Trend {
            collector: collector.to_string(),
            metric: metric.to_string(),
            slope_per_sec: slope,
            r_squared,
            direction,
            samples: samples.len(),
            latest: points.last()?.1,
        })
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::from_config(&TrendConfig::default())
    }
}

fn linear_regression_slope(samples: &[(f64, f64)]) -> f64 {
    let n = samples.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;

    for (x, y) in samples {
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < f64::EPSILON {
        return 0.0;
    }

    (n * sum_xy - sum_x * sum_y) / denominator
}

fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let elapsed = to - from;
    match elapsed.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => elapsed.num_milliseconds() as f64 / 1000.0,
    }
}

/// Coefficient of determination; 0 for a flat series
fn r_squared(samples: &[(f64, f64)], slope: f64) -> f64 {
    let n = samples.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let mean_x = samples.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = samples.iter().map(|(_, y)| y).sum::<f64>() / n;
    let intercept = mean_y - slope * mean_x;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (x, y) in samples {
        ss_res += (y - (slope * x + intercept)).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }

    if ss_tot.abs() < f64::EPSILON {
        return 0.0;
    }

    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}
