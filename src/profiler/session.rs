use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::{CommandExecutionResult, CommandStats};

/// A named window of profiled command executions.
#[derive(Debug)]
pub struct ProfileSession {
    name: String,
    start_time: DateTime<Utc>,
    started: Instant,
    total_time: Mutex<Option<Duration>>,
    executions: Mutex<Vec<CommandExecutionResult>>,
}

impl ProfileSession {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_time: Utc::now(),
            started: Instant::now(),
            total_time: Mutex::new(None),
            executions: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Elapsed time; frozen once the session is stopped.
    pub fn total_time(&self) -> Duration {
        let stopped = *self.total_time.lock().unwrap_or_else(PoisonError::into_inner);
        stopped.unwrap_or_else(|| self.started.elapsed())
    }

    pub fn is_stopped(&self) -> bool {
        self.total_time.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub(crate) fn stop(&self) {
        let mut total = self.total_time.lock().unwrap_or_else(PoisonError::into_inner);
        if total.is_none() {
            *total = Some(self.started.elapsed());
        }
    }

    pub fn add_command_execution(&self, result: CommandExecutionResult) {
        self.executions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result);
    }

    pub fn command_executions(&self) -> Vec<CommandExecutionResult> {
        self.executions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Per-command totals keyed by qualified command name.
    pub fn calculate_summary_statistics(&self) -> BTreeMap<String, CommandStats> {
        let executions = self.executions.lock().unwrap_or_else(PoisonError::into_inner);
        let mut summary: BTreeMap<String, CommandStats> = BTreeMap::new();
        for execution in executions.iter() {
            summary
                .entry(execution.command_name.clone())
                .or_default()
                .add(execution);
        }
        summary
    }
}
