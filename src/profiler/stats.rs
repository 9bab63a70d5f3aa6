use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::session::StatementListener;
use crate::transaction::StatementKind;

pub const DEFAULT_COMMAND_PACKAGE: &str = "org.flowable.engine.impl.cmd.";

/// Names starting with `org.flowable` are kept, anything else is taken to be
/// a short engine command name.
pub fn qualified_command_name(name: &str) -> String {
    if name.starts_with("org.flowable") {
        name.to_string()
    } else {
        format!("{DEFAULT_COMMAND_PACKAGE}{name}")
    }
}

pub type StatementCounts = BTreeMap<String, u64>;

fn merge(into: &mut StatementCounts, from: &StatementCounts) {
    for (key, count) in from {
        *into.entry(key.clone()).or_insert(0) += count;
    }
}

/// What one command did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandExecutionResult {
    pub command_name: String,
    pub total_time: Duration,
    pub database_time: Duration,
    pub db_selects: StatementCounts,
    pub db_inserts: StatementCounts,
    pub db_updates: StatementCounts,
    pub db_deletes: StatementCounts,
    pub failed: bool,
}

impl CommandExecutionResult {
    pub fn new(command_name: impl Into<String>) -> Self {
        Self {
            command_name: command_name.into(),
            ..Self::default()
        }
    }

    fn record(&mut self, kind: StatementKind, key: &str) {
        let map = match kind {
            StatementKind::Select => &mut self.db_selects,
            StatementKind::Insert => &mut self.db_inserts,
            StatementKind::Update => &mut self.db_updates,
            StatementKind::Delete => &mut self.db_deletes,
        };
        *map.entry(key.to_string()).or_insert(0) += 1;
    }
}

/// Collects statements for one command while it runs.
#[derive(Debug, Default)]
pub struct CommandExecutionRecorder {
    result: Mutex<CommandExecutionResult>,
}

impl CommandExecutionRecorder {
    pub fn new(command_name: impl Into<String>) -> Self {
        Self {
            result: Mutex::new(CommandExecutionResult::new(command_name)),
        }
    }

    pub fn finish(&self, total_time: Duration, failed: bool) -> CommandExecutionResult {
        let mut result = self.result.lock().unwrap_or_else(PoisonError::into_inner).clone();
        result.total_time = total_time;
        result.failed = failed;
        result
    }
}

impl StatementListener for CommandExecutionRecorder {
    fn on_statement(&self, kind: StatementKind, key: &str) {
        self.result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(kind, key);
    }

    fn on_database_time(&self, elapsed: Duration) {
        self.result
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .database_time += elapsed;
    }
}

/// Aggregate of every execution of one command within a profile session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandStats {
    pub execution_count: u64,
    pub failed_count: u64,
    pub total_command_time: Duration,
    pub total_database_time: Duration,
    pub db_selects: StatementCounts,
    pub db_inserts: StatementCounts,
    pub db_updates: StatementCounts,
    pub db_deletes: StatementCounts,
}

impl CommandStats {
    pub fn add(&mut self, result: &CommandExecutionResult) {
        self.execution_count += 1;
        if result.failed {
            self.failed_count += 1;
        }
        self.total_command_time += result.total_time;
        self.total_database_time += result.database_time;
        merge(&mut self.db_selects, &result.db_selects);
        merge(&mut self.db_inserts, &result.db_inserts);
        merge(&mut self.db_updates, &result.db_updates);
        merge(&mut self.db_deletes, &result.db_deletes);
    }

    pub fn average_execution_time(&self) -> Duration {
        match u32::try_from(self.execution_count) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(count) => self.total_command_time / count,
        }
    }

    pub fn average_database_time(&self) -> Duration {
        match u32::try_from(self.execution_count) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(count) => self.total_database_time / count,
        }
    }

    pub fn select_count(&self, key: &str) -> u64 {
        self.db_selects.get(key).copied().unwrap_or(0)
    }

    pub fn insert_count(&self, key: &str) -> u64 {
        self.db_inserts.get(key).copied().unwrap_or(0)
    }

    pub fn update_count(&self, key: &str) -> u64 {
        self.db_updates.get(key).copied().unwrap_or(0)
    }

    pub fn delete_count(&self, key: &str) -> u64 {
        self.db_deletes.get(key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_command_name() {
        assert_eq!(
            qualified_command_name("CompleteTaskCmd"),
            "org.flowable.engine.impl.cmd.CompleteTaskCmd"
        );
        assert_eq!(
            qualified_command_name("org.flowable.job.service.impl.cmd.ExecuteJobCmd"),
            "org.flowable.job.service.impl.cmd.ExecuteJobCmd"
        );
    }

    #[test]
    fn test_stats_sum_statement_maps() {
        let recorder = CommandExecutionRecorder::new("X");
        recorder.on_statement(StatementKind::Select, "selectA");
        recorder.on_statement(StatementKind::Select, "selectA");
        recorder.on_statement(StatementKind::Delete, "Bulk-delete-x");
        let first = recorder.finish(Duration::from_millis(4), false);

        let mut stats = CommandStats::default();
        stats.add(&first);
        stats.add(&CommandExecutionResult {
            total_time: Duration::from_millis(2),
            failed: true,
            ..first.clone()
        });

        assert_eq!(stats.execution_count, 2);
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.select_count("selectA"), 4);
        assert_eq!(stats.delete_count("Bulk-delete-x"), 2);
        assert_eq!(stats.average_execution_time(), Duration::from_millis(3));
        assert_eq!(stats.insert_count("missing"), 0);
    }
}
