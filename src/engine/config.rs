use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::core::{Clock, EngineError, Result, SystemClock};
use crate::entity::{CountingPolicy, EntityKind};
use crate::session::SessionSettings;

/// How much history the engine keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum HistoryLevel {
    None,
    /// Process, activity, task and variable instances.
    Activity,
    /// Activity plus task log entries, identity links, entity links and comments.
    #[default]
    Audit,
    Full,
}

impl HistoryLevel {
    pub fn is_at_least(self, level: HistoryLevel) -> bool {
        self >= level
    }
}

/// Process engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Engine name, used in logs
    pub engine_name: String,

    /// Group pending inserts of one kind into a single statement
    pub bulk_insert_enabled: bool,

    /// Largest number of rows in one bulk insert
    pub max_statements_in_bulk_insert: usize,

    /// Kinds that may be bulk inserted
    pub bulk_insertable_kinds: HashSet<EntityKind>,

    /// Load the whole execution tree when one execution is loaded
    pub enable_eager_execution_tree_fetching: bool,

    /// Keep relationship counts on executions
    pub enable_execution_relationship_counts: bool,

    /// Keep relationship counts on tasks
    pub enable_task_relationship_counts: bool,

    pub history_level: HistoryLevel,

    /// Pause between acquisition cycles of the async executor
    pub async_executor_poll_interval: Duration,

    /// How long an acquired job stays locked
    pub async_executor_lock_time: Duration,

    /// Jobs executed at the same time
    pub async_executor_max_concurrent_jobs: usize,

    /// Retries given to new jobs
    pub async_executor_default_retries: i32,

    /// Lock owner written on acquired jobs
    pub async_executor_lock_owner: String,

    pub clock: Arc<dyn Clock>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_name: "default".to_string(),
            bulk_insert_enabled: true,
            max_statements_in_bulk_insert: 100,
            bulk_insertable_kinds: EntityKind::ALL
                .iter()
                .copied()
                .filter(|kind| kind.default_bulk_insertable())
                .collect(),
            enable_eager_execution_tree_fetching: false,
            enable_execution_relationship_counts: true,
            enable_task_relationship_counts: true,
            history_level: HistoryLevel::default(),
            async_executor_poll_interval: Duration::from_millis(100),
            async_executor_lock_time: Duration::from_secs(300),
            async_executor_max_concurrent_jobs: 4,
            async_executor_default_retries: 3,
            async_executor_lock_owner: format!("async-executor-{}", uuid::Uuid::new_v4()),
            clock: Arc::new(SystemClock),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engine_name(mut self, name: &str) -> Self {
        self.engine_name = name.to_string();
        self
    }

    pub fn bulk_insert_enabled(mut self, enabled: bool) -> Self {
        self.bulk_insert_enabled = enabled;
        self
    }

    pub fn max_statements_in_bulk_insert(mut self, max: usize) -> Self {
        self.max_statements_in_bulk_insert = max;
        self
    }

    /// Replace the set of bulk-insertable kinds
    pub fn bulk_insertable_kinds(mut self, kinds: impl IntoIterator<Item = EntityKind>) -> Self {
        self.bulk_insertable_kinds = kinds.into_iter().collect();
        self
    }

    pub fn enable_eager_execution_tree_fetching(mut self, enabled: bool) -> Self {
        self.enable_eager_execution_tree_fetching = enabled;
        self
    }

    pub fn enable_execution_relationship_counts(mut self, enabled: bool) -> Self {
        self.enable_execution_relationship_counts = enabled;
        self
    }

    pub fn enable_task_relationship_counts(mut self, enabled: bool) -> Self {
        self.enable_task_relationship_counts = enabled;
        self
    }

    /// Turn both relationship count switches on or off
    pub fn enable_relationship_counts(self, enabled: bool) -> Self {
        self.enable_execution_relationship_counts(enabled)
            .enable_task_relationship_counts(enabled)
    }

    pub fn history_level(mut self, level: HistoryLevel) -> Self {
        self.history_level = level;
        self
    }

    pub fn async_executor_poll_interval(mut self, interval: Duration) -> Self {
        self.async_executor_poll_interval = interval;
        self
    }

    pub fn async_executor_lock_time(mut self, lock_time: Duration) -> Self {
        self.async_executor_lock_time = lock_time;
        self
    }

    pub fn async_executor_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.async_executor_max_concurrent_jobs = max;
        self
    }

    pub fn async_executor_default_retries(mut self, retries: i32) -> Self {
        self.async_executor_default_retries = retries;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.engine_name.trim().is_empty() {
            return Err(EngineError::IllegalArgument("engine_name cannot be empty".into()));
        }
        if self.max_statements_in_bulk_insert == 0 {
            return Err(EngineError::IllegalArgument(
                "max_statements_in_bulk_insert must be > 0".into(),
            ));
        }
        if self.async_executor_max_concurrent_jobs == 0 {
            return Err(EngineError::IllegalArgument(
                "async_executor_max_concurrent_jobs must be > 0".into(),
            ));
        }
        if self.async_executor_default_retries < 1 {
            return Err(EngineError::IllegalArgument(
                "async_executor_default_retries must be >= 1".into(),
            ));
        }
        if self.async_executor_poll_interval.is_zero() {
            return Err(EngineError::IllegalArgument(
                "async_executor_poll_interval must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            bulk_insert_enabled: self.bulk_insert_enabled,
            max_statements_in_bulk_insert: self.max_statements_in_bulk_insert,
            bulk_insertable: self.bulk_insertable_kinds.clone(),
            eager_execution_tree_fetching: self.enable_eager_execution_tree_fetching,
        }
    }

    pub fn counting_policy(&self) -> CountingPolicy {
        CountingPolicy {
            executions: self.enable_execution_relationship_counts,
            tasks: self.enable_task_relationship_counts,
        }
    }

    pub fn history_enabled(&self, level: HistoryLevel) -> bool {
        level != HistoryLevel::None && self.history_level.is_at_least(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.bulk_insert_enabled);
        assert_eq!(config.max_statements_in_bulk_insert, 100);
        assert_eq!(config.history_level, HistoryLevel::Audit);
        assert!(!config.bulk_insertable_kinds.contains(&EntityKind::Comment));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_bulk_size() {
        let config = EngineConfig::new().max_statements_in_bulk_insert(0);
        assert!(matches!(config.validate(), Err(EngineError::IllegalArgument(_))));
    }

    #[test]
    fn test_history_levels() {
        let audit = EngineConfig::new();
        assert!(audit.history_enabled(HistoryLevel::Activity));
        assert!(audit.history_enabled(HistoryLevel::Audit));
        assert!(!audit.history_enabled(HistoryLevel::Full));

        let none = EngineConfig::new().history_level(HistoryLevel::None);
        assert!(!none.history_enabled(HistoryLevel::Activity));
        assert!(!none.history_enabled(HistoryLevel::None));
    }
}
