//! Relationship counts kept on executions and tasks.
//!
//! A zero count on an entity whose counting is enabled proves that no related
//! rows exist, so the matching lookup query can be skipped.

use serde::{Deserialize, Serialize};

use super::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionRelation {
    ChildExecutions,
    Tasks,
    Jobs,
    TimerJobs,
    SuspendedJobs,
    DeadLetterJobs,
    Variables,
    IdentityLinks,
    EventSubscriptions,
}

impl ExecutionRelation {
    /// The relation that tracks rows of the given job kind.
    pub fn for_job_kind(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::Job => Some(Self::Jobs),
            EntityKind::TimerJob => Some(Self::TimerJobs),
            EntityKind::SuspendedJob => Some(Self::SuspendedJobs),
            EntityKind::DeadLetterJob => Some(Self::DeadLetterJobs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCounts {
    pub enabled: bool,
    pub child_executions: u32,
    pub tasks: u32,
    pub jobs: u32,
    pub timer_jobs: u32,
    pub suspended_jobs: u32,
    pub dead_letter_jobs: u32,
    pub variables: u32,
    pub identity_links: u32,
    pub event_subscriptions: u32,
}

impl ExecutionCounts {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn get(&self, relation: ExecutionRelation) -> u32 {
        match relation {
            ExecutionRelation::ChildExecutions => self.child_executions,
            ExecutionRelation::Tasks => self.tasks,
            ExecutionRelation::Jobs => self.jobs,
            ExecutionRelation::TimerJobs => self.timer_jobs,
            ExecutionRelation::SuspendedJobs => self.suspended_jobs,
            ExecutionRelation::DeadLetterJobs => self.dead_letter_jobs,
            ExecutionRelation::Variables => self.variables,
            ExecutionRelation::IdentityLinks => self.identity_links,
            ExecutionRelation::EventSubscriptions => self.event_subscriptions,
        }
    }

    fn slot(&mut self, relation: ExecutionRelation) -> &mut u32 {
        match relation {
            ExecutionRelation::ChildExecutions => &mut self.child_executions,
            ExecutionRelation::Tasks => &mut self.tasks,
            ExecutionRelation::Jobs => &mut self.jobs,
            ExecutionRelation::TimerJobs => &mut self.timer_jobs,
            ExecutionRelation::SuspendedJobs => &mut self.suspended_jobs,
            ExecutionRelation::DeadLetterJobs => &mut self.dead_letter_jobs,
            ExecutionRelation::Variables => &mut self.variables,
            ExecutionRelation::IdentityLinks => &mut self.identity_links,
            ExecutionRelation::EventSubscriptions => &mut self.event_subscriptions,
        }
    }

    pub fn increment(&mut self, relation: ExecutionRelation) {
        if self.enabled {
            *self.slot(relation) += 1;
        }
    }

    pub fn decrement(&mut self, relation: ExecutionRelation) {
        if self.enabled {
            let slot = self.slot(relation);
            *slot = slot.saturating_sub(1);
        }
    }

    /// True when counting is on for this execution and nothing is related.
    pub fn proves_none(&self, relation: ExecutionRelation) -> bool {
        self.enabled && self.get(relation) == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskRelation {
    Variables,
    IdentityLinks,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub enabled: bool,
    pub variables: u32,
    pub identity_links: u32,
}

impl TaskCounts {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub fn get(&self, relation: TaskRelation) -> u32 {
        match relation {
            TaskRelation::Variables => self.variables,
            TaskRelation::IdentityLinks => self.identity_links,
        }
    }

    fn slot(&mut self, relation: TaskRelation) -> &mut u32 {
        match relation {
            TaskRelation::Variables => &mut self.variables,
            TaskRelation::IdentityLinks => &mut self.identity_links,
        }
    }

    pub fn increment(&mut self, relation: TaskRelation) {
        if self.enabled {
            *self.slot(relation) += 1;
        }
    }

    pub fn decrement(&mut self, relation: TaskRelation) {
        if self.enabled {
            let slot = self.slot(relation);
            *slot = slot.saturating_sub(1);
        }
    }

    pub fn proves_none(&self, relation: TaskRelation) -> bool {
        self.enabled && self.get(relation) == 0
    }
}

/// Global switches combined with the per-entity `enabled` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountingPolicy {
    pub executions: bool,
    pub tasks: bool,
}

impl CountingPolicy {
    pub fn skip_execution_lookup(&self, counts: &ExecutionCounts, relation: ExecutionRelation) -> bool {
        self.executions && counts.proves_none(relation)
    }

    pub fn skip_task_lookup(&self, counts: &TaskCounts, relation: TaskRelation) -> bool {
        self.tasks && counts.proves_none(relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_never_go_negative() {
        let mut counts = ExecutionCounts::new(true);
        counts.decrement(ExecutionRelation::Tasks);
        assert_eq!(counts.tasks, 0);

        counts.increment(ExecutionRelation::Tasks);
        counts.increment(ExecutionRelation::Tasks);
        counts.decrement(ExecutionRelation::Tasks);
        assert_eq!(counts.get(ExecutionRelation::Tasks), 1);
    }

    #[test]
    fn test_disabled_counts_prove_nothing() {
        let mut counts = ExecutionCounts::new(false);
        counts.increment(ExecutionRelation::Jobs);
        assert_eq!(counts.jobs, 0);
        assert!(!counts.proves_none(ExecutionRelation::Jobs));

        let policy = CountingPolicy { executions: true, tasks: true };
        assert!(!policy.skip_execution_lookup(&counts, ExecutionRelation::Jobs));
    }

    #[test]
    fn test_policy_switch_overrides_entity_flag() {
        let counts = TaskCounts::new(true);
        let on = CountingPolicy { executions: true, tasks: true };
        let off = CountingPolicy { executions: true, tasks: false };
        assert!(on.skip_task_lookup(&counts, TaskRelation::IdentityLinks));
        assert!(!off.skip_task_lookup(&counts, TaskRelation::IdentityLinks));
    }

    #[test]
    fn test_job_kind_relation() {
        assert_eq!(
            ExecutionRelation::for_job_kind(EntityKind::TimerJob),
            Some(ExecutionRelation::TimerJobs)
        );
        assert_eq!(ExecutionRelation::for_job_kind(EntityKind::Task), None);
    }
}
