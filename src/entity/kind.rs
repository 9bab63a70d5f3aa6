use std::fmt;

use serde::{Deserialize, Serialize};

use super::naming;

/// Every persistent record type known to the session and storage.
///
/// Declaration order is the tie-breaker of the insert order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    ProcessDefinition,
    Execution,
    ActivityInstance,
    EventSubscription,
    Task,
    VariableInstance,
    Job,
    TimerJob,
    SuspendedJob,
    DeadLetterJob,
    IdentityLink,
    EntityLink,
    Comment,
    HistoricProcessInstance,
    HistoricActivityInstance,
    HistoricTaskInstance,
    HistoricTaskLogEntry,
    HistoricVariableInstance,
    HistoricIdentityLink,
    HistoricEntityLink,
}

impl EntityKind {
    pub const ALL: [EntityKind; 20] = [
        EntityKind::ProcessDefinition,
        EntityKind::Execution,
        EntityKind::ActivityInstance,
        EntityKind::EventSubscription,
        EntityKind::Task,
        EntityKind::VariableInstance,
        EntityKind::Job,
        EntityKind::TimerJob,
        EntityKind::SuspendedJob,
        EntityKind::DeadLetterJob,
        EntityKind::IdentityLink,
        EntityKind::EntityLink,
        EntityKind::Comment,
        EntityKind::HistoricProcessInstance,
        EntityKind::HistoricActivityInstance,
        EntityKind::HistoricTaskInstance,
        EntityKind::HistoricTaskLogEntry,
        EntityKind::HistoricVariableInstance,
        EntityKind::HistoricIdentityLink,
        EntityKind::HistoricEntityLink,
    ];

    pub fn class_name(self) -> &'static str {
        match self {
            Self::ProcessDefinition => "ProcessDefinitionEntityImpl",
            Self::Execution => "ExecutionEntityImpl",
            Self::ActivityInstance => "ActivityInstanceEntityImpl",
            Self::EventSubscription => "EventSubscriptionEntityImpl",
            Self::Task => "TaskEntityImpl",
            Self::VariableInstance => "VariableInstanceEntityImpl",
            Self::Job => "JobEntityImpl",
            Self::TimerJob => "TimerJobEntityImpl",
            Self::SuspendedJob => "SuspendedJobEntityImpl",
            Self::DeadLetterJob => "DeadLetterJobEntityImpl",
            Self::IdentityLink => "IdentityLinkEntityImpl",
            Self::EntityLink => "EntityLinkEntityImpl",
            Self::Comment => "CommentEntityImpl",
            Self::HistoricProcessInstance => "HistoricProcessInstanceEntityImpl",
            Self::HistoricActivityInstance => "HistoricActivityInstanceEntityImpl",
            Self::HistoricTaskInstance => "HistoricTaskInstanceEntityImpl",
            Self::HistoricTaskLogEntry => "HistoricTaskLogEntryEntityImpl",
            Self::HistoricVariableInstance => "HistoricVariableInstanceEntityImpl",
            Self::HistoricIdentityLink => "HistoricIdentityLinkEntityImpl",
            Self::HistoricEntityLink => "HistoricEntityLinkEntityImpl",
        }
    }

    pub fn qualified_name(self) -> String {
        naming::qualified_name(self.class_name())
    }

    pub fn is_historic(self) -> bool {
        matches!(
            self,
            Self::HistoricProcessInstance
                | Self::HistoricActivityInstance
                | Self::HistoricTaskInstance
                | Self::HistoricTaskLogEntry
                | Self::HistoricVariableInstance
                | Self::HistoricIdentityLink
                | Self::HistoricEntityLink
        )
    }

    pub fn is_job(self) -> bool {
        matches!(
            self,
            Self::Job | Self::TimerJob | Self::SuspendedJob | Self::DeadLetterJob
        )
    }

    /// Kinds that may be grouped into one multi-row insert.
    pub fn default_bulk_insertable(self) -> bool {
        !matches!(
            self,
            Self::ProcessDefinition | Self::Comment | Self::HistoricTaskLogEntry
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}
