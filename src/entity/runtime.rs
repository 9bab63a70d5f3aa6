//! Runtime entity shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::counts::{ExecutionCounts, TaskCounts};
use crate::core::VariableValue;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessDefinitionEntity {
    pub id: String,
    pub revision: i32,
    pub key: String,
    pub version: i32,
    pub name: Option<String>,
    pub deployment_id: String,
    /// The JSON model the definition was deployed from.
    pub resource: String,
    pub suspended: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionEntity {
    pub id: String,
    pub revision: i32,
    pub process_definition_id: String,
    pub process_definition_key: String,
    pub process_instance_id: String,
    pub root_process_instance_id: String,
    pub parent_id: Option<String>,
    pub super_execution_id: Option<String>,
    pub activity_id: Option<String>,
    pub business_key: Option<String>,
    pub is_active: bool,
    pub is_concurrent: bool,
    pub is_scope: bool,
    pub is_ended: bool,
    pub suspended: bool,
    pub start_time: DateTime<Utc>,
    pub counts: ExecutionCounts,
}

impl ExecutionEntity {
    pub fn is_process_instance(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Ids of other executions this row points at.
    pub fn referenced_executions(&self) -> impl Iterator<Item = &str> {
        let process_instance = (self.process_instance_id != self.id).then_some(self.process_instance_id.as_str());
        let root = (self.root_process_instance_id != self.id).then_some(self.root_process_instance_id.as_str());
        [
            self.parent_id.as_deref(),
            process_instance,
            root,
            self.super_execution_id.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityInstanceEntity {
    pub id: String,
    pub revision: i32,
    pub process_definition_id: String,
    pub process_instance_id: String,
    pub execution_id: String,
    pub activity_id: String,
    pub activity_name: Option<String>,
    pub activity_type: String,
    pub task_id: Option<String>,
    pub called_process_instance_id: Option<String>,
    pub assignee: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub delete_reason: Option<String>,
}

impl ActivityInstanceEntity {
    pub fn mark_ended(&mut self, now: DateTime<Utc>, delete_reason: Option<&str>) {
        self.end_time = Some(now);
        self.duration_ms = Some((now - self.start_time).num_milliseconds());
        self.delete_reason = delete_reason.map(str::to_string);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventSubscriptionEntity {
    pub id: String,
    pub revision: i32,
    pub event_type: String,
    pub event_name: String,
    pub execution_id: String,
    pub process_instance_id: String,
    pub activity_id: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskEntity {
    pub id: String,
    pub revision: i32,
    pub name: Option<String>,
    pub task_definition_key: Option<String>,
    pub execution_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub process_definition_id: Option<String>,
    pub assignee: Option<String>,
    pub owner: Option<String>,
    pub claim_time: Option<DateTime<Utc>>,
    pub create_time: DateTime<Utc>,
    pub suspended: bool,
    pub counts: TaskCounts,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableInstanceEntity {
    pub id: String,
    pub revision: i32,
    pub name: String,
    pub value: VariableValue,
    pub execution_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobHandler {
    AsyncContinuation,
    TriggerTimer,
}

impl JobHandler {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AsyncContinuation => "async-continuation",
            Self::TriggerTimer => "trigger-timer",
        }
    }
}

/// Shared shape of executable, timer, suspended and dead-letter jobs.
#[derive(Debug, Clone, PartialEq)]
pub struct JobEntity {
    pub id: String,
    pub revision: i32,
    pub handler: JobHandler,
    pub execution_id: String,
    pub process_instance_id: String,
    pub process_definition_id: String,
    pub element_id: String,
    pub retries: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub lock_owner: Option<String>,
    pub lock_expiration: Option<DateTime<Utc>>,
    pub exception_message: Option<String>,
    pub create_time: DateTime<Utc>,
}

impl JobEntity {
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.lock_expiration, Some(expiration) if expiration > now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityLinkType {
    Candidate,
    Assignee,
    Owner,
    Participant,
    Starter,
}

impl IdentityLinkType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Assignee => "assignee",
            Self::Owner => "owner",
            Self::Participant => "participant",
            Self::Starter => "starter",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityLinkEntity {
    pub id: String,
    pub revision: i32,
    pub link_type: IdentityLinkType,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub task_id: Option<String>,
    pub process_instance_id: Option<String>,
}

pub const SCOPE_TYPE_BPMN: &str = "bpmn";
pub const SCOPE_TYPE_TASK: &str = "task";
pub const ENTITY_LINK_TYPE_CHILD: &str = "child";

#[derive(Debug, Clone, PartialEq)]
pub struct EntityLinkEntity {
    pub id: String,
    pub revision: i32,
    pub link_type: String,
    pub scope_id: String,
    pub scope_type: String,
    pub ref_scope_id: String,
    pub ref_scope_type: String,
    pub root_scope_id: String,
    pub root_scope_type: String,
    pub hierarchy_type: Option<String>,
    pub create_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentEntity {
    pub id: String,
    pub revision: i32,
    pub comment_type: String,
    pub task_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub user_id: Option<String>,
    pub action: String,
    pub message: String,
    pub time: DateTime<Utc>,
}
