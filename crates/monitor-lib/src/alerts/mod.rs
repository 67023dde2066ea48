//! Alerting: evaluation, queueing, dispatch and remediation
//!
//! This module provides:
//! - Static threshold rules (warning/critical bands)
//! - z-score anomaly detection over a window of recent values
//! - The alert queue and the dispatcher with per-type cool-down
//! - Remediation executors invoked for critical alert groups

mod anomaly;
mod dispatcher;
mod evaluator;
mod remediation;

pub use anomaly::{Anomaly, AnomalyBand, AnomalyDetector, WindowStats};
pub use dispatcher::{AlertDispatcher, AlertQueue, Dispatch, DispatchCycle};
pub use evaluator::{AlertEvaluator, ThresholdRule, WatchedRule};
pub use remediation::{CommandExecutor, LoggingExecutor, RemediationExecutor};
