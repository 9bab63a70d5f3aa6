//! Named statements: selects matched against storage and the session cache,
//! and bulk deletes.

use chrono::{DateTime, Utc};

use crate::entity::{
    Entity, EntityData, EntityKind, IdentityLinkType, JobEntity, JobHandler, naming,
};

fn matches_filter(filter: &Option<String>, value: &str) -> bool {
    filter.as_deref().is_none_or(|expected| expected == value)
}

fn matches_optional(filter: &Option<String>, value: Option<&str>) -> bool {
    match filter.as_deref() {
        None => true,
        Some(expected) => value == Some(expected),
    }
}

fn matches_flag(filter: Option<bool>, value: bool) -> bool {
    filter.is_none_or(|expected| expected == value)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessInstanceCriteria {
    pub process_instance_id: Option<String>,
    pub process_definition_key: Option<String>,
    pub business_key: Option<String>,
    pub super_process_instance_id: Option<String>,
    pub suspended: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskCriteria {
    pub task_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub execution_id: Option<String>,
    pub task_definition_key: Option<String>,
    pub name: Option<String>,
    pub assignee: Option<String>,
    pub unassigned: bool,
    pub suspended: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobCriteria {
    pub job_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub execution_id: Option<String>,
    pub element_id: Option<String>,
    pub handler: Option<JobHandler>,
    pub with_exception: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricProcessInstanceCriteria {
    pub process_instance_id: Option<String>,
    pub process_definition_key: Option<String>,
    pub business_key: Option<String>,
    pub finished: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricActivityInstanceCriteria {
    pub process_instance_id: Option<String>,
    pub activity_id: Option<String>,
    pub activity_type: Option<String>,
    pub finished: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricTaskInstanceCriteria {
    pub task_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub task_definition_key: Option<String>,
    pub assignee: Option<String>,
    pub finished: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricVariableInstanceCriteria {
    pub process_instance_id: Option<String>,
    pub task_id: Option<String>,
    pub variable_name: Option<String>,
}

/// Owner of a set of variables.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableScope {
    Execution(String),
    Task(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityQuery {
    LatestProcessDefinitionByKey(String),
    ExecutionsWithSameRootProcessInstanceId(String),
    ExecutionsByParentExecutionId(String),
    SubProcessInstanceBySuperExecutionId(String),
    ProcessInstancesByQueryCriteria(ProcessInstanceCriteria),
    TasksByExecutionId(String),
    TasksByQueryCriteria(TaskCriteria),
    JobsByExecutionId { kind: EntityKind, execution_id: String },
    JobsByQueryCriteria { kind: EntityKind, criteria: JobCriteria },
    TimerJobsToExecute(DateTime<Utc>),
    JobsToExecute(DateTime<Utc>),
    VariablesByQuery(VariableScope),
    IdentityLinksByTaskId(String),
    IdentityLinkByTaskUserGroupAndType {
        task_id: String,
        user_id: Option<String>,
        group_id: Option<String>,
        link_type: IdentityLinkType,
    },
    IdentityLinksByProcessInstance(String),
    EventSubscriptionsByExecution(String),
    EventSubscriptionsByNameAndExecution {
        event_type: String,
        event_name: String,
        execution_id: Option<String>,
    },
    UnfinishedActivityInstanceExecutionIdAndActivityId {
        execution_id: String,
        activity_id: String,
    },
    ActivityInstanceByTaskId(String),
    EntityLinksByScopeIdAndType { scope_id: String, scope_type: String },
    CommentsByTaskId(String),
    HistoricProcessInstancesByQueryCriteria(HistoricProcessInstanceCriteria),
    HistoricActivityInstancesByQueryCriteria(HistoricActivityInstanceCriteria),
    HistoricTaskInstancesByQueryCriteria(HistoricTaskInstanceCriteria),
    HistoricTaskLogEntriesByTaskId(String),
    HistoricVariableInstancesByQueryCriteria(HistoricVariableInstanceCriteria),
    HistoricIdentityLinksByTask(String),
}

impl EntityQuery {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::LatestProcessDefinitionByKey(_) => EntityKind::ProcessDefinition,
            Self::ExecutionsWithSameRootProcessInstanceId(_)
            | Self::ExecutionsByParentExecutionId(_)
            | Self::SubProcessInstanceBySuperExecutionId(_)
            | Self::ProcessInstancesByQueryCriteria(_) => EntityKind::Execution,
            Self::TasksByExecutionId(_) | Self::TasksByQueryCriteria(_) => EntityKind::Task,
            Self::JobsByExecutionId { kind, .. } | Self::JobsByQueryCriteria { kind, .. } => *kind,
            Self::TimerJobsToExecute(_) => EntityKind::TimerJob,
            Self::JobsToExecute(_) => EntityKind::Job,
            Self::VariablesByQuery(_) => EntityKind::VariableInstance,
            Self::IdentityLinksByTaskId(_)
            | Self::IdentityLinkByTaskUserGroupAndType { .. }
            | Self::IdentityLinksByProcessInstance(_) => EntityKind::IdentityLink,
            Self::EventSubscriptionsByExecution(_)
            | Self::EventSubscriptionsByNameAndExecution { .. } => EntityKind::EventSubscription,
            Self::UnfinishedActivityInstanceExecutionIdAndActivityId { .. }
            | Self::ActivityInstanceByTaskId(_) => EntityKind::ActivityInstance,
            Self::EntityLinksByScopeIdAndType { .. } => EntityKind::EntityLink,
            Self::CommentsByTaskId(_) => EntityKind::Comment,
            Self::HistoricProcessInstancesByQueryCriteria(_) => EntityKind::HistoricProcessInstance,
            Self::HistoricActivityInstancesByQueryCriteria(_) => {
                EntityKind::HistoricActivityInstance
            }
            Self::HistoricTaskInstancesByQueryCriteria(_) => EntityKind::HistoricTaskInstance,
            Self::HistoricTaskLogEntriesByTaskId(_) => EntityKind::HistoricTaskLogEntry,
            Self::HistoricVariableInstancesByQueryCriteria(_) => {
                EntityKind::HistoricVariableInstance
            }
            Self::HistoricIdentityLinksByTask(_) => EntityKind::HistoricIdentityLink,
        }
    }

    /// The profiling key of the select.
    pub fn statement(&self) -> &'static str {
        match self {
            Self::LatestProcessDefinitionByKey(_) => "selectLatestProcessDefinitionByKey",
            Self::ExecutionsWithSameRootProcessInstanceId(_) => {
                "selectExecutionsWithSameRootProcessInstanceId"
            }
            Self::ExecutionsByParentExecutionId(_) => "selectExecutionsByParentExecutionId",
            Self::SubProcessInstanceBySuperExecutionId(_) => {
                "selectSubProcessInstanceBySuperExecutionId"
            }
            Self::ProcessInstancesByQueryCriteria(_) => "selectProcessInstanceByQueryCriteria",
            Self::TasksByExecutionId(_) => "selectTasksByExecutionId",
            Self::TasksByQueryCriteria(_) => "selectTaskByQueryCriteria",
            Self::JobsByExecutionId { kind, .. } => match kind {
                EntityKind::TimerJob => "selectTimerJobsByExecutionId",
                EntityKind::SuspendedJob => "selectSuspendedJobsByExecutionId",
                EntityKind::DeadLetterJob => "selectDeadLetterJobsByExecutionId",
                _ => "selectJobsByExecutionId",
            },
            Self::JobsByQueryCriteria { kind, .. } => match kind {
                EntityKind::TimerJob => "selectTimerJobByQueryCriteria",
                EntityKind::SuspendedJob => "selectSuspendedJobByQueryCriteria",
                EntityKind::DeadLetterJob => "selectDeadLetterJobByQueryCriteria",
                _ => "selectJobByQueryCriteria",
            },
            Self::TimerJobsToExecute(_) => "selectTimerJobsToExecute",
            Self::JobsToExecute(_) => "selectJobsToExecute",
            Self::VariablesByQuery(_) => "selectVariablesByQuery",
            Self::IdentityLinksByTaskId(_) => "selectIdentityLinksByTaskId",
            Self::IdentityLinkByTaskUserGroupAndType { .. } => {
                "selectIdentityLinkByTaskUserGroupAndType"
            }
            Self::IdentityLinksByProcessInstance(_) => "selectIdentityLinksByProcessInstance",
            Self::EventSubscriptionsByExecution(_) => "selectEventSubscriptionsByExecution",
            Self::EventSubscriptionsByNameAndExecution { .. } => {
                "selectEventSubscriptionsByNameAndExecution"
            }
            Self::UnfinishedActivityInstanceExecutionIdAndActivityId { .. } => {
                "selectUnfinishedActivityInstanceExecutionIdAndActivityId"
            }
            Self::ActivityInstanceByTaskId(_) => "selectActivityInstanceByTaskId",
            Self::EntityLinksByScopeIdAndType { .. } => "selectEntityLinksByScopeIdAndType",
            Self::CommentsByTaskId(_) => "selectCommentsByTaskId",
            Self::HistoricProcessInstancesByQueryCriteria(_) => {
                "selectHistoricProcessInstancesByQueryCriteria"
            }
            Self::HistoricActivityInstancesByQueryCriteria(_) => {
                "selectHistoricActivityInstancesByQueryCriteria"
            }
            Self::HistoricTaskInstancesByQueryCriteria(_) => {
                "selectHistoricTaskInstancesByQueryCriteria"
            }
            Self::HistoricTaskLogEntriesByTaskId(_) => "selectHistoricTaskLogEntriesByQueryCriteria",
            Self::HistoricVariableInstancesByQueryCriteria(_) => {
                "selectHistoricVariableInstanceByQueryCriteria"
            }
            Self::HistoricIdentityLinksByTask(_) => "selectHistoricIdentityLinksByTask",
        }
    }

    /// Whether `entity` is a row this query selects.
    pub fn matches(&self, entity: &Entity) -> bool {
        if entity.kind() != self.kind() {
            return false;
        }
        match (self, entity) {
            (Self::LatestProcessDefinitionByKey(key), Entity::ProcessDefinition(d)) => d.key == *key,
            (Self::ExecutionsWithSameRootProcessInstanceId(root), Entity::Execution(e)) => {
                e.root_process_instance_id == *root
            }
            (Self::ExecutionsByParentExecutionId(parent), Entity::Execution(e)) => {
                e.parent_id.as_deref() == Some(parent.as_str())
            }
            (Self::SubProcessInstanceBySuperExecutionId(sup), Entity::Execution(e)) => {
                e.super_execution_id.as_deref() == Some(sup.as_str())
            }
            (Self::ProcessInstancesByQueryCriteria(c), Entity::Execution(e)) => {
                e.is_process_instance()
                    && matches_filter(&c.process_instance_id, &e.id)
                    && matches_filter(&c.process_definition_key, &e.process_definition_key)
                    && matches_optional(&c.business_key, e.business_key.as_deref())
                    && matches_optional(&c.super_process_instance_id, e.super_execution_id.as_deref())
                    && matches_flag(c.suspended, e.suspended)
            }
            (Self::TasksByExecutionId(id), Entity::Task(t)) => {
                t.execution_id.as_deref() == Some(id.as_str())
            }
            (Self::TasksByQueryCriteria(c), Entity::Task(t)) => {
                matches_filter(&c.task_id, &t.id)
                    && matches_optional(&c.process_instance_id, t.process_instance_id.as_deref())
                    && matches_optional(&c.execution_id, t.execution_id.as_deref())
                    && matches_optional(&c.task_definition_key, t.task_definition_key.as_deref())
                    && matches_optional(&c.name, t.name.as_deref())
                    && matches_optional(&c.assignee, t.assignee.as_deref())
                    && (!c.unassigned || t.assignee.is_none())
                    && matches_flag(c.suspended, t.suspended)
            }
            (Self::JobsByExecutionId { execution_id, .. }, entity) => {
                JobEntity::from_entity(entity).is_some_and(|j| j.execution_id == *execution_id)
            }
            (Self::JobsByQueryCriteria { criteria: c, .. }, entity) => {
                JobEntity::from_entity(entity).is_some_and(|j| {
                    matches_filter(&c.job_id, &j.id)
                        && matches_filter(&c.process_instance_id, &j.process_instance_id)
                        && matches_filter(&c.execution_id, &j.execution_id)
                        && matches_filter(&c.element_id, &j.element_id)
                        && c.handler.is_none_or(|h| h == j.handler)
                        && (!c.with_exception || j.exception_message.is_some())
                })
            }
            (Self::TimerJobsToExecute(now), Entity::TimerJob(j)) => {
                j.due_date.is_some_and(|due| due <= *now) && !j.is_locked_at(*now)
            }
            (Self::JobsToExecute(now), Entity::Job(j)) => j.retries > 0 && !j.is_locked_at(*now),
            (Self::VariablesByQuery(scope), Entity::VariableInstance(v)) => match scope {
                VariableScope::Execution(id) => {
                    v.task_id.is_none() && v.execution_id.as_deref() == Some(id.as_str())
                }
                VariableScope::Task(id) => v.task_id.as_deref() == Some(id.as_str()),
            },
            (Self::IdentityLinksByTaskId(id), Entity::IdentityLink(l)) => {
                l.task_id.as_deref() == Some(id.as_str())
            }
            (
                Self::IdentityLinkByTaskUserGroupAndType {
                    task_id,
                    user_id,
                    group_id,
                    link_type,
                },
                Entity::IdentityLink(l),
            ) => {
                l.task_id.as_deref() == Some(task_id.as_str())
                    && l.user_id == *user_id
                    && l.group_id == *group_id
                    && l.link_type == *link_type
            }
            (Self::IdentityLinksByProcessInstance(id), Entity::IdentityLink(l)) => {
                l.process_instance_id.as_deref() == Some(id.as_str())
            }
            (Self::EventSubscriptionsByExecution(id), Entity::EventSubscription(s)) => {
                s.execution_id == *id
            }
            (
                Self::EventSubscriptionsByNameAndExecution {
                    event_type,
                    event_name,
                    execution_id,
                },
                Entity::EventSubscription(s),
            ) => {
                s.event_type == *event_type
                    && s.event_name == *event_name
                    && matches_filter(execution_id, &s.execution_id)
            }
            (
                Self::UnfinishedActivityInstanceExecutionIdAndActivityId {
                    execution_id,
                    activity_id,
                },
                Entity::ActivityInstance(a),
            ) => a.execution_id == *execution_id && a.activity_id == *activity_id && a.end_time.is_none(),
            (Self::ActivityInstanceByTaskId(id), Entity::ActivityInstance(a)) => {
                a.task_id.as_deref() == Some(id.as_str())
            }
            (Self::EntityLinksByScopeIdAndType { scope_id, scope_type }, Entity::EntityLink(l)) => {
                l.scope_id == *scope_id && l.scope_type == *scope_type
            }
            (Self::CommentsByTaskId(id), Entity::Comment(c)) => c.task_id.as_deref() == Some(id.as_str()),
            (Self::HistoricProcessInstancesByQueryCriteria(c), Entity::HistoricProcessInstance(h)) => {
                matches_filter(&c.process_instance_id, &h.id)
                    && matches_filter(&c.process_definition_key, &h.process_definition_key)
                    && matches_optional(&c.business_key, h.business_key.as_deref())
                    && matches_flag(c.finished, h.end_time.is_some())
            }
            (
                Self::HistoricActivityInstancesByQueryCriteria(c),
                Entity::HistoricActivityInstance(h),
            ) => {
                matches_filter(&c.process_instance_id, &h.process_instance_id)
                    && matches_filter(&c.activity_id, &h.activity_id)
                    && matches_filter(&c.activity_type, &h.activity_type)
                    && matches_flag(c.finished, h.end_time.is_some())
            }
            (Self::HistoricTaskInstancesByQueryCriteria(c), Entity::HistoricTaskInstance(h)) => {
                matches_filter(&c.task_id, &h.id)
                    && matches_optional(&c.process_instance_id, h.process_instance_id.as_deref())
                    && matches_optional(&c.task_definition_key, h.task_definition_key.as_deref())
                    && matches_optional(&c.assignee, h.assignee.as_deref())
                    && matches_flag(c.finished, h.end_time.is_some())
            }
            (Self::HistoricTaskLogEntriesByTaskId(id), Entity::HistoricTaskLogEntry(h)) => {
                h.task_id == *id
            }
            (
                Self::HistoricVariableInstancesByQueryCriteria(c),
                Entity::HistoricVariableInstance(h),
            ) => {
                matches_optional(&c.process_instance_id, h.process_instance_id.as_deref())
                    && matches_optional(&c.task_id, h.task_id.as_deref())
                    && matches_filter(&c.variable_name, &h.name)
            }
            (Self::HistoricIdentityLinksByTask(id), Entity::HistoricIdentityLink(h)) => {
                h.task_id.as_deref() == Some(id.as_str())
            }
            _ => false,
        }
    }
}

/// A delete of every row matching a foreign key, issued as one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkDelete {
    ActivityInstancesByProcessInstanceId(String),
    TasksByExecutionId(String),
    EntityLinksByRootScopeIdAndRootScopeType {
        root_scope_id: String,
        root_scope_type: String,
    },
}

impl BulkDelete {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::ActivityInstancesByProcessInstanceId(_) => EntityKind::ActivityInstance,
            Self::TasksByExecutionId(_) => EntityKind::Task,
            Self::EntityLinksByRootScopeIdAndRootScopeType { .. } => EntityKind::EntityLink,
        }
    }

    pub fn statement(&self) -> &'static str {
        match self {
            Self::ActivityInstancesByProcessInstanceId(_) => {
                "deleteActivityInstancesByProcessInstanceId"
            }
            Self::TasksByExecutionId(_) => "deleteTasksByExecutionId",
            Self::EntityLinksByRootScopeIdAndRootScopeType { .. } => {
                "deleteEntityLinksByRootScopeIdAndRootScopeType"
            }
        }
    }

    pub fn key(&self) -> String {
        naming::bulk_delete_key(self.statement())
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        match (self, entity) {
            (Self::ActivityInstancesByProcessInstanceId(id), Entity::ActivityInstance(a)) => {
                a.process_instance_id == *id
            }
            (Self::TasksByExecutionId(id), Entity::Task(t)) => {
                t.execution_id.as_deref() == Some(id.as_str())
            }
            (
                Self::EntityLinksByRootScopeIdAndRootScopeType {
                    root_scope_id,
                    root_scope_type,
                },
                Entity::EntityLink(l),
            ) => l.root_scope_id == *root_scope_id && l.root_scope_type == *root_scope_type,
            _ => false,
        }
    }
}
