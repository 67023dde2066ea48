//! Statistical anomaly detection
//!
//! Compares the newest value of a metric against the mean and population
//! standard deviation of the values preceding it in a fixed-size window.

/// Minimum window the detector accepts (one baseline value plus the newest)
const MIN_WINDOW: usize = 2;

/// Severity band of a detected anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyBand {
    /// Between the medium and high z thresholds (inclusive of high)
    Medium,
    /// Above the high z threshold
    High,
}

impl AnomalyBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyBand::Medium => "medium",
            AnomalyBand::High => "high",
        }
    }
}

/// Mean and population standard deviation of a set of values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

impl WindowStats {
    pub fn from_values(values: &[f64]) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                mean: 0.0,
                std_dev: 0.0,
                count: 0,
            };
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Self {
            mean,
            std_dev: variance.sqrt(),
            count,
        }
    }
}

/// A value lying too many standard deviations from its recent baseline
#[derive(Debug, Clone)]
pub struct Anomaly {
    pub value: f64,
    pub expected: f64,
    pub std_dev: f64,
    pub z_score: f64,
    pub band: AnomalyBand,
    /// z threshold of the band that fired
    pub threshold: f64,
}

/// z-score detector over a fixed window of recent values
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    /// Values considered, including the newest one
    pub window: usize,
    pub medium_z: f64,
    pub high_z: f64,
    /// Baseline σ is floored at this fraction of |mean|
    pub min_relative_std_dev: f64,
}

impl AnomalyDetector {
    pub fn new(window: usize, medium_z: f64, high_z: f64) -> Self {
        Self {
            window: window.max(MIN_WINDOW),
            medium_z,
            high_z,
            min_relative_std_dev: 0.01,
        }
    }

    pub fn with_min_relative_std_dev(mut self, ratio: f64) -> Self {
        self.min_relative_std_dev = ratio.max(0.0);
        self
    }

    /// z-score of the last value against the ones before it
    ///
    /// Returns `None` when fewer than `window` values are supplied. A zero
    /// effective σ yields a z-score of 0.
    pub fn z_score(&self, values: &[f64]) -> Option<(f64, WindowStats)> {
        if values.len() < self.window {
            return None;
        }

        let window = &values[values.len() - self.window..];
        let (latest, baseline) = window.split_last()?;
        let stats = WindowStats::from_values(baseline);

        let std_dev = stats.std_dev.max(self.min_relative_std_dev * stats.mean.abs());
        if std_dev < f64::EPSILON {
            return Some((0.0, stats));
        }

        Some(((latest - stats.mean).abs() / std_dev, stats))
    }

    /// Detect an anomaly in the newest of `values` (oldest first)
    pub fn detect(&self, values: &[f64]) -> Option<Anomaly> {
        let (z_score, stats) = self.z_score(values)?;
        let value = *values.last()?;

        let (band, threshold) = if z_score > self.high_z {
            (AnomalyBand::High, self.high_z)
        } else if z_score > self.medium_z {
            (AnomalyBand::Medium, self.medium_z)
        } else {
            return None;
        };

        Some(Anomaly {
            value,
            expected: stats.mean,
            std_dev: stats.std_dev,
            z_score,
            band,
            threshold,
        })
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(10, 2.0, 3.0)
    }
}
