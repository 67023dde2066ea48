//! Metrics store
//!
//! Per-collector bounded history of snapshots with FIFO eviction, plus the
//! bookkeeping behind collector status (last success, error counts).

use crate::models::{MetricFields, MetricSnapshot};
use crate::path::{MetricPath, MetricRef};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tracing::warn;

/// Bounded, timestamp-ordered history of one collector's snapshots
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    snapshots: VecDeque<MetricSnapshot>,
    max_size: usize,
}

impl MetricsHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            snapshots: VecDeque::with_capacity(max_size.min(1024)),
            max_size: max_size.max(1),
        }
    }

    /// Append a snapshot, evicting the oldest entries beyond the bound
    ///
    /// Snapshots older than the newest entry are rejected so the history
    /// stays non-decreasing in timestamp.
    pub fn push(&mut self, snapshot: MetricSnapshot) -> bool {
        if let Some(last) = self.snapshots.back() {
            if snapshot.timestamp < last.timestamp {
                return false;
            }
        }

        while self.snapshots.len() >= self.max_size {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(snapshot);
        true
    }

    pub fn latest(&self) -> Option<&MetricSnapshot> {
        self.snapshots.back()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Snapshots oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &MetricSnapshot> + ExactSizeIterator {
        self.snapshots.iter()
    }

    /// Most recent `n` values of `path` recorded before `snapshot`, oldest first
    ///
    /// `snapshot` itself is skipped when it is already the newest entry, and
    /// entries stamped after it are ignored.
    pub fn values_before(&self, path: &MetricPath, snapshot: &MetricSnapshot, n: usize) -> Vec<f64> {
        let skip = usize::from(self.latest() == Some(snapshot));
        let mut values: Vec<f64> = self
            .snapshots
            .iter()
            .rev()
            .skip(skip)
            .filter(|s| s.timestamp <= snapshot.timestamp)
            .filter_map(|s| path.resolve(&s.fields))
            .take(n)
            .collect();
        values.reverse();
        values
    }

    /// Most recent `n` (timestamp, value) points of `path`, oldest first
    ///
    /// Snapshots where the path does not resolve are skipped.
    pub fn recent_points(&self, path: &MetricPath, n: usize) -> Vec<(DateTime<Utc>, f64)> {
        let mut points: Vec<_> = self
            .snapshots
            .iter()
            .rev()
            .filter_map(|s| path.resolve(&s.fields).map(|v| (s.timestamp, v)))
            .take(n)
            .collect();
        points.reverse();
        points
    }
}

/// Per-collector collection bookkeeping
#[derive(Debug, Clone, Default)]
pub struct CollectionStats {
    pub last_collection: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<f64>,
    pub errors: u64,
    pub last_error: Option<String>,
}

/// Histories for all collectors
#[derive(Debug)]
pub struct MetricsStore {
    histories: HashMap<String, MetricsHistory>,
    stats: HashMap<String, CollectionStats>,
    max_size: usize,
}

impl MetricsStore {
    pub fn new(max_size: usize) -> Self {
        Self {
            histories: HashMap::new(),
            stats: HashMap::new(),
            max_size,
        }
    }

    /// Stamp and append a freshly collected snapshot
    ///
    /// The timestamp is taken here, under the store's lock, and clamped to the
    /// newest existing entry so a clock step backwards cannot break ordering.
    pub fn record(
        &mut self,
        collector: &str,
        fields: MetricFields,
        duration: Duration,
    ) -> MetricSnapshot {
        let history = self
            .histories
            .entry(collector.to_string())
            .or_insert_with(|| MetricsHistory::new(self.max_size));

        let mut timestamp = Utc::now();
        if let Some(last) = history.latest() {
            timestamp = timestamp.max(last.timestamp);
        }

        let snapshot = MetricSnapshot {
            collector: collector.to_string(),
            timestamp,
            fields,
            collection_duration_ms: duration.as_secs_f64() * 1000.0,
        };
        history.push(snapshot.clone());

        let stats = self.stats.entry(collector.to_string()).or_default();
        stats.last_collection = Some(timestamp);
        stats.last_duration_ms = Some(snapshot.collection_duration_ms);

        snapshot
    }

    /// Append a snapshot with its own timestamp
    pub fn append(&mut self, snapshot: MetricSnapshot) -> bool {
        let collector = snapshot.collector.clone();
        let timestamp = snapshot.timestamp;
        let duration = snapshot.collection_duration_ms;

        let history = self
            .histories
            .entry(collector.clone())
            .or_insert_with(|| MetricsHistory::new(self.max_size));

        if !history.push(snapshot) {
            warn!(collector = %collector, "Rejected out-of-order snapshot");
            return false;
        }

        let stats = self.stats.entry(collector).or_default();
        stats.last_collection = Some(timestamp);
        stats.last_duration_ms = Some(duration);
        true
    }

    /// Record a failed collection tick
    pub fn record_failure(&mut self, collector: &str, error: String) {
        let stats = self.stats.entry(collector.to_string()).or_default();
        stats.errors += 1;
        stats.last_error = Some(error);
    }

    pub fn history(&self, collector: &str) -> Option<&MetricsHistory> {
        self.histories.get(collector)
    }

    pub fn latest(&self, collector: &str) -> Option<&MetricSnapshot> {
        self.histories.get(collector).and_then(MetricsHistory::latest)
    }

    pub fn stats(&self, collector: &str) -> Option<&CollectionStats> {
        self.stats.get(collector)
    }

    /// Latest value of a metric reference
    ///
    /// A pinned reference reads that collector's latest snapshot. An open
    /// reference reads the most recent latest-snapshot among collectors that
    /// expose the path (last writer wins).
    pub fn latest_value(&self, metric: &MetricRef) -> Option<f64> {
        match &metric.collector {
            Some(collector) => self
                .latest(collector)
                .and_then(|s| metric.path.resolve(&s.fields)),
            None => self
                .histories
                .values()
                .filter_map(MetricsHistory::latest)
                .filter_map(|s| metric.path.resolve(&s.fields).map(|v| (s.timestamp, v)))
                .max_by_key(|(ts, _)| *ts)
                .map(|(_, v)| v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricValue;
    use chrono::TimeZone;

    fn fields(pairs: &[(&str, f64)]) -> MetricFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), MetricValue::Number(*v)))
            .collect()
    }

    fn snapshot(collector: &str, secs: i64, pairs: &[(&str, f64)]) -> MetricSnapshot {
        MetricSnapshot {
            collector: collector.to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            fields: fields(pairs),
            collection_duration_ms: 1.0,
        }
    }

    #[test]
    fn test_retention_keeps_most_recent_in_order() {
        let mut history = MetricsHistory::new(1000);
        for i in 0..1500 {
            assert!(history.push(snapshot("system", i, &[("tick", i as f64)])));
        }

        assert_eq!(history.len(), 1000);
        let ticks: Vec<f64> = history
            .iter()
            .map(|s| s.fields["tick"].as_f64().unwrap())
            .collect();
        let expected: Vec<f64> = (500..1500).map(|i| i as f64).collect();
        assert_eq!(ticks, expected);
        assert!(history
            .iter()
            .zip(history.iter().skip(1))
            .all(|(a, b)| a.timestamp <= b.timestamp));
    }

    #[test]
    fn test_out_of_order_snapshot_rejected() {
        let mut history = MetricsHistory::new(10);
        assert!(history.push(snapshot("system", 10, &[])));
        assert!(history.push(snapshot("system", 10, &[])));
        assert!(!history.push(snapshot("system", 5, &[])));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_recent_points_skip_missing() {
        let mut history = MetricsHistory::new(10);
        history.push(snapshot("workload", 0, &[("queue_size", 1.0)]));
        history.push(snapshot("workload", 1, &[]));
        history.push(snapshot("workload", 2, &[("queue_size", 3.0)]));
        history.push(snapshot("workload", 3, &[("queue_size", 4.0)]));

        let path = MetricPath::parse("queue_size").unwrap();
        let values = |n| -> Vec<f64> {
            history.recent_points(&path, n).into_iter().map(|(_, v)| v).collect()
        };
        assert_eq!(values(2), vec![3.0, 4.0]);
        assert_eq!(values(10), vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn test_values_before_excludes_the_snapshot() {
        let mut history = MetricsHistory::new(10);
        for i in 0..4 {
            history.push(snapshot("system", i, &[("cpu", i as f64)]));
        }
        let path = MetricPath::parse("cpu").unwrap();

        let stored = history.latest().unwrap().clone();
        assert_eq!(history.values_before(&path, &stored, 2), vec![1.0, 2.0]);

        let pending = snapshot("system", 4, &[("cpu", 50.0)]);
        assert_eq!(history.values_before(&path, &pending, 2), vec![2.0, 3.0]);

        let earlier = snapshot("system", 1, &[("cpu", 7.0)]);
        assert_eq!(history.values_before(&path, &earlier, 5), vec![0.0, 1.0]);
    }

    #[test]
    fn test_record_stamps_monotonic_timestamps() {
        let mut store = MetricsStore::new(5);
        let first = store.record("system", fields(&[("cpu", 1.0)]), Duration::from_millis(3));
        let second = store.record("system", fields(&[("cpu", 2.0)]), Duration::from_millis(4));

        assert!(second.timestamp >= first.timestamp);
        assert_eq!(store.history("system").unwrap().len(), 2);
        assert_eq!(store.stats("system").unwrap().last_duration_ms, Some(4.0));
        assert_eq!(store.latest("system").unwrap().fields["cpu"], MetricValue::Number(2.0));
    }

    #[test]
    fn test_latest_value_last_writer_wins() {
        let mut store = MetricsStore::new(5);
        store.append(snapshot("a", 0, &[("queue_size", 1.0)]));
        store.append(snapshot("b", 5, &[("queue_size", 2.0)]));
        store.append(snapshot("c", 10, &[("other", 9.0)]));

        let open = MetricRef::parse("queue_size").unwrap();
        assert_eq!(store.latest_value(&open), Some(2.0));

        let pinned = MetricRef::parse("a:queue_size").unwrap();
        assert_eq!(store.latest_value(&pinned), Some(1.0));

        let missing = MetricRef::parse("throughput").unwrap();
        assert_eq!(store.latest_value(&missing), None);
    }

    #[test]
    fn test_record_failure_tracks_errors() {
        let mut store = MetricsStore::new(5);
        store.record_failure("system", "boom".to_string());
        store.record_failure("system", "boom again".to_string());

        let stats = store.stats("system").unwrap();
        assert_eq!(stats.errors, 2);
        assert_eq!(stats.last_error.as_deref(), Some("boom again"));
        assert!(store.history("system").is_none());
    }
}
