//! Remediation executors
//!
//! The dispatcher hands each chosen action to an executor. Executors are
//! invoked fire-and-forget; their failures are logged by the caller and never
//! retried.

use crate::error::RemediationError;
use crate::models::Alert;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs a named remediation action
#[async_trait]
pub trait RemediationExecutor: Send + Sync {
    async fn execute(&self, action: &str, alerts: &[Alert]) -> Result<(), RemediationError>;
}

/// Executor that only records the action in the log
#[derive(Debug, Default, Clone)]
pub struct LoggingExecutor;

#[async_trait]
impl RemediationExecutor for LoggingExecutor {
    async fn execute(&self, action: &str, alerts: &[Alert]) -> Result<(), RemediationError> {
        info!(
            event = "remediation_logged",
            action = %action,
            alerts = alerts.len(),
            "Remediation requested (logging executor, no command run)"
        );
        Ok(())
    }
}

/// Executor running an external command per action
///
/// The command receives `MONITOR_ACTION` and `MONITOR_ALERTS` (JSON array of
/// the triggering alerts) in its environment.
#[derive(Debug, Default, Clone)]
pub struct CommandExecutor {
    /// Action -> program followed by its arguments
    commands: HashMap<String, Vec<String>>,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, action: impl Into<String>, command: Vec<String>) -> Self {
        self.commands.insert(action.into(), command);
        self
    }

    pub fn from_commands(commands: HashMap<String, Vec<String>>) -> Self {
        Self { commands }
    }
}

#[async_trait]
impl RemediationExecutor for CommandExecutor {
    async fn execute(&self, action: &str, alerts: &[Alert]) -> Result<(), RemediationError> {
        let (program, args) = self
            .commands
            .get(action)
            .and_then(|c| c.split_first())
            .ok_or_else(|| RemediationError::UnknownAction(action.to_string()))?;

        let payload = serde_json::to_string(alerts).map_err(|source| RemediationError::Encode {
            action: action.to_string(),
            source,
        })?;

        debug!(action = %action, program = %program, "Running remediation command");

        let status = Command::new(program)
            .args(args)
            .env("MONITOR_ACTION", action)
            .env("MONITOR_ALERTS", payload)
            .status()
            .await
            .map_err(|source| RemediationError::Spawn {
                action: action.to_string(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(RemediationError::Failed {
                action: action.to_string(),
                status: status.to_string(),
            })
        }
    }
}
