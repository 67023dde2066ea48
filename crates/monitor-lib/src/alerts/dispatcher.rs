//! Alert queue and dispatcher
//!
//! The dispatcher scans unacknowledged alerts, groups them by type, picks one
//! remediation action per group that contains a critical alert, and
//! acknowledges everything it looked at. A per-type cool-down suppresses
//! repeated dispatches during alert storms.

use crate::config::MonitorConfig;
use crate::models::{Alert, AlertCounts};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

/// All alerts raised during the run
///
/// Alerts are appended by the evaluator path and only acknowledged through
/// [`AlertDispatcher::process`].
#[derive(Debug, Default)]
pub struct AlertQueue {
    alerts: Vec<Alert>,
}

impl AlertQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, alert: Alert) {
        self.alerts.push(alert);
    }

    pub fn extend(&mut self, alerts: impl IntoIterator<Item = Alert>) {
        self.alerts.extend(alerts);
    }

    pub fn all(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn unacknowledged(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|a| !a.acknowledged)
    }

    pub fn get(&self, id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn counts(&self) -> AlertCounts {
        AlertCounts {
            total: self.alerts.len(),
            unacknowledged: self.unacknowledged().count(),
            critical: self.alerts.iter().filter(|a| a.is_critical()).count(),
        }
    }

    /// Acknowledge the given alerts and return the ones this call changed
    fn acknowledge(&mut self, ids: &HashSet<String>, at: DateTime<Utc>) -> Vec<Alert> {
        let mut acknowledged = Vec::new();
        for alert in self.alerts.iter_mut() {
            if !alert.acknowledged && ids.contains(&alert.id) {
                alert.acknowledged = true;
                alert.acknowledged_at = Some(at);
                acknowledged.push(alert.clone());
            }
        }
        acknowledged
    }
}

/// One remediation to invoke
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub action: String,
    pub alert_type: String,
    /// Alerts of the group as they were when dispatched
    pub alerts: Vec<Alert>,
}

/// Outcome of one dispatcher cycle
#[derive(Debug, Clone, Default)]
pub struct DispatchCycle {
    pub dispatches: Vec<Dispatch>,
    /// Alert types whose dispatch fell inside the cool-down
    pub suppressed: Vec<String>,
    /// Critical groups with no configured action
    pub unmapped: Vec<String>,
    pub acknowledged: usize,
    /// Alerts acknowledged by this cycle, as stored after acknowledgment
    pub acknowledged_alerts: Vec<Alert>,
}

/// Groups unacknowledged alerts and decides remediation
#[derive(Debug)]
pub struct AlertDispatcher {
    /// Alert type -> action name
    actions: BTreeMap<String, String>,
    cooldown: Duration,
    /// Alert type -> last dispatch time
    last_dispatch: HashMap<String, DateTime<Utc>>,
}

impl AlertDispatcher {
    pub fn new(actions: BTreeMap<String, String>, cooldown: Duration) -> Self {
        Self {
            actions,
            cooldown,
            last_dispatch: HashMap::new(),
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.remediation.clone(), config.dispatcher.cooldown())
    }

    pub fn action_for(&self, alert_type: &str) -> Option<&str> {
        self.actions.get(alert_type).map(String::as_str)
    }

    /// Whether a dispatch for `alert_type` at `now` falls inside the cool-down
    pub fn should_suppress(&self, alert_type: &str, now: DateTime<Utc>) -> bool {
        if self.cooldown.is_zero() {
            return false;
        }

        match self.last_dispatch.get(alert_type) {
            // A clock step backwards counts as inside the window
            Some(last) => (now - *last)
                .to_std()
                .map(|elapsed| elapsed < self.cooldown)
                .unwrap_or(true),
            None => false,
        }
    }

    /// Run one cycle over `queue`
    pub fn process(&mut self, queue: &mut AlertQueue, now: DateTime<Utc>) -> DispatchCycle {
        let mut groups: BTreeMap<String, Vec<Alert>> = BTreeMap::new();
        for alert in queue.unacknowledged() {
            groups
                .entry(alert.alert_type.clone())
                .or_default()
                .push(alert.clone());
        }

        let mut cycle = DispatchCycle::default();
        let mut seen = HashSet::new();

        for (alert_type, alerts) in groups {
            seen.extend(alerts.iter().map(|a| a.id.clone()));

            if !alerts.iter().any(Alert::is_critical) {
                continue;
            }

            let Some(action) = self.actions.get(&alert_type).cloned() else {
                cycle.unmapped.push(alert_type);
                continue;
            };

            if self.should_suppress(&alert_type, now) {
                cycle.suppressed.push(alert_type);
                continue;
            }

            self.last_dispatch.insert(alert_type.clone(), now);
            cycle.dispatches.push(Dispatch {
                action,
                alert_type,
                alerts,
            });
        }

        cycle.acknowledged_alerts = queue.acknowledge(&seen, now);
        cycle.acknowledged = cycle.acknowledged_alerts.len();
        self.cleanup(now);
        cycle
    }

    /// Drop cool-down entries that have expired
    pub fn cleanup(&mut self, now: DateTime<Utc>) {
        let cooldown = self.cooldown;
        self.last_dispatch.retain(|_, last| {
            (now - *last)
                .to_std()
                .map(|elapsed| elapsed < cooldown)
                .unwrap_or(true)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertSeverity;
    use chrono::Duration as ChronoDuration;

    fn alert(id: &str, alert_type: &str, severity: AlertSeverity) -> Alert {
        Alert {
            id: id.to_string(),
            severity,
            alert_type: alert_type.to_string(),
            collector: "system".to_string(),
            message: format!("{} alert", alert_type),
            metric: "cpu_utilization".to_string(),
            value: 95.0,
            threshold: 90.0,
            z_score: None,
            timestamp: Utc::now(),
            acknowledged: false,
            acknowledged_at: None,
        }
    }

    fn dispatcher(cooldown: Duration) -> AlertDispatcher {
        let mut actions = BTreeMap::new();
        actions.insert("high_cpu".to_string(), "scale_workers".to_string());
        actions.insert("high_memory".to_string(), "free_memory".to_string());
        AlertDispatcher::new(actions, cooldown)
    }

    #[test]
    fn test_critical_group_dispatches_once_and_acknowledges() {
        let mut queue = AlertQueue::new();
        queue.push(alert("a1", "high_cpu", AlertSeverity::Critical));
        queue.push(alert("a2", "high_cpu", AlertSeverity::Critical));
        queue.push(alert("a3", "high_cpu", AlertSeverity::Warning));

        let mut dispatcher = dispatcher(Duration::ZERO);
        let now = Utc::now();
        let cycle = dispatcher.process(&mut queue, now);

        assert_eq!(cycle.dispatches.len(), 1);
        assert_eq!(cycle.dispatches[0].action, "scale_workers");
        assert_eq!(cycle.dispatches[0].alerts.len(), 3);
        assert_eq!(cycle.acknowledged, 3);
        assert!(cycle.acknowledged_alerts.iter().all(|a| a.acknowledged_at == Some(now)));
        assert!(queue.all().iter().all(|a| a.acknowledged));
        assert!(queue.all().iter().all(|a| a.acknowledged_at == Some(now)));
    }

    #[test]
    fn test_acknowledged_alerts_never_redispatched() {
        let mut queue = AlertQueue::new();
        queue.push(alert("a1", "high_cpu", AlertSeverity::Critical));

        let mut dispatcher = dispatcher(Duration::ZERO);
        let first = dispatcher.process(&mut queue, Utc::now());
        assert_eq!(first.dispatches.len(), 1);
        let acked_at = queue.get("a1").unwrap().acknowledged_at;

        for _ in 0..3 {
            let cycle = dispatcher.process(&mut queue, Utc::now());
            assert!(cycle.dispatches.is_empty());
            assert_eq!(cycle.acknowledged, 0);
        }

        let stored = queue.get("a1").unwrap();
        assert!(stored.acknowledged);
        assert_eq!(stored.acknowledged_at, acked_at);
    }

    #[test]
    fn test_warning_only_group_acknowledged_without_dispatch() {
        let mut queue = AlertQueue::new();
        queue.push(alert("w1", "high_cpu", AlertSeverity::Warning));

        let mut dispatcher = dispatcher(Duration::ZERO);
        let cycle = dispatcher.process(&mut queue, Utc::now());

        assert!(cycle.dispatches.is_empty());
        assert_eq!(cycle.acknowledged, 1);
    }

    #[test]
    fn test_groups_by_type() {
        let mut queue = AlertQueue::new();
        queue.push(alert("c1", "high_cpu", AlertSeverity::Critical));
        queue.push(alert("m1", "high_memory", AlertSeverity::Critical));
        queue.push(alert("x1", "disk_full", AlertSeverity::Critical));

        let mut dispatcher = dispatcher(Duration::ZERO);
        let cycle = dispatcher.process(&mut queue, Utc::now());

        let actions: Vec<_> = cycle.dispatches.iter().map(|d| d.action.as_str()).collect();
        assert_eq!(actions, vec!["scale_workers", "free_memory"]);
        assert_eq!(cycle.unmapped, vec!["disk_full".to_string()]);
        assert_eq!(cycle.acknowledged, 3);
    }

    #[test]
    fn test_cooldown_suppresses_repeat_dispatch() {
        let mut dispatcher = dispatcher(Duration::from_secs(300));
        let mut queue = AlertQueue::new();
        let start = Utc::now();

        queue.push(alert("a1", "high_cpu", AlertSeverity::Critical));
        assert_eq!(dispatcher.process(&mut queue, start).dispatches.len(), 1);

        queue.push(alert("a2", "high_cpu", AlertSeverity::Critical));
        let cycle = dispatcher.process(&mut queue, start + ChronoDuration::seconds(60));
        assert!(cycle.dispatches.is_empty());
        assert_eq!(cycle.suppressed, vec!["high_cpu".to_string()]);
        assert!(queue.get("a2").unwrap().acknowledged);

        queue.push(alert("a3", "high_cpu", AlertSeverity::Critical));
        let cycle = dispatcher.process(&mut queue, start + ChronoDuration::seconds(301));
        assert_eq!(cycle.dispatches.len(), 1);
    }

    #[test]
    fn test_cooldown_is_per_type() {
        let mut dispatcher = dispatcher(Duration::from_secs(300));
        let mut queue = AlertQueue::new();
        let now = Utc::now();

        queue.push(alert("a1", "high_cpu", AlertSeverity::Critical));
        dispatcher.process(&mut queue, now);

        queue.push(alert("m1", "high_memory", AlertSeverity::Critical));
        let cycle = dispatcher.process(&mut queue, now + ChronoDuration::seconds(1));
        assert_eq!(cycle.dispatches.len(), 1);
        assert_eq!(cycle.dispatches[0].alert_type, "high_memory");
    }

    #[test]
    fn test_queue_counts() {
        let mut queue = AlertQueue::new();
        queue.push(alert("a1", "high_cpu", AlertSeverity::Critical));
        queue.push(alert("a2", "high_cpu", AlertSeverity::Warning));

        let counts = queue.counts();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.unacknowledged, 2);
        assert_eq!(counts.critical, 1);
    }
}
