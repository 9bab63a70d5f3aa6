//! Historic mirrors. A historic row shares its id with the runtime row it
//! mirrors and outlives it.

use chrono::{DateTime, Utc};

use super::runtime::{
    ActivityInstanceEntity, EntityLinkEntity, IdentityLinkEntity, IdentityLinkType, TaskEntity,
    VariableInstanceEntity,
};
use crate::core::VariableValue;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoricProcessInstanceEntity {
    pub id: String,
    pub revision: i32,
    pub process_definition_id: String,
    pub process_definition_key: String,
    pub business_key: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub start_activity_id: Option<String>,
    pub end_activity_id: Option<String>,
    pub super_process_instance_id: Option<String>,
    pub delete_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoricActivityInstanceEntity {
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

impl HistoricActivityInstanceEntity {
    /// Copies the mutable state of the runtime row, keeping this row's revision.
    pub fn sync_from(&mut self, runtime: &ActivityInstanceEntity) {
        self.task_id = runtime.task_id.clone();
        self.called_process_instance_id = runtime.called_process_instance_id.clone();
        self.assignee = runtime.assignee.clone();
        self.end_time = runtime.end_time;
        self.duration_ms = runtime.duration_ms;
        self.delete_reason = runtime.delete_reason.clone();
    }
}

impl From<&ActivityInstanceEntity> for HistoricActivityInstanceEntity {
    fn from(runtime: &ActivityInstanceEntity) -> Self {
        Self {
            id: runtime.id.clone(),
            revision: 1,
            process_definition_id: runtime.process_definition_id.clone(),
            process_instance_id: runtime.process_instance_id.clone(),
            execution_id: runtime.execution_id.clone(),
            activity_id: runtime.activity_id.clone(),
            activity_name: runtime.activity_name.clone(),
            activity_type: runtime.activity_type.clone(),
            task_id: runtime.task_id.clone(),
            called_process_instance_id: runtime.called_process_instance_id.clone(),
            assignee: runtime.assignee.clone(),
            start_time: runtime.start_time,
            end_time: runtime.end_time,
            duration_ms: runtime.duration_ms,
            delete_reason: runtime.delete_reason.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoricTaskInstanceEntity {
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
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
    pub delete_reason: Option<String>,
    pub last_updated_time: Option<DateTime<Utc>>,
}

impl From<&TaskEntity> for HistoricTaskInstanceEntity {
    fn from(task: &TaskEntity) -> Self {
        Self {
            id: task.id.clone(),
            revision: 1,
            name: task.name.clone(),
            task_definition_key: task.task_definition_key.clone(),
            execution_id: task.execution_id.clone(),
            process_instance_id: task.process_instance_id.clone(),
            process_definition_id: task.process_definition_id.clone(),
            assignee: task.assignee.clone(),
            owner: task.owner.clone(),
            claim_time: task.claim_time,
            start_time: task.create_time,
            end_time: None,
            duration_ms: None,
            delete_reason: None,
            last_updated_time: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoricTaskLogEntryEntity {
    pub id: String,
    pub revision: i32,
    pub log_type: String,
    pub task_id: String,
    pub process_instance_id: Option<String>,
    pub time_stamp: DateTime<Utc>,
    pub user_id: Option<String>,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoricVariableInstanceEntity {
    pub id: String,
    pub revision: i32,
    pub name: String,
    pub value: VariableValue,
    pub process_instance_id: Option<String>,
    pub execution_id: Option<String>,
    pub task_id: Option<String>,
    pub create_time: DateTime<Utc>,
    pub last_updated_time: DateTime<Utc>,
    pub removed_time: Option<DateTime<Utc>>,
}

impl HistoricVariableInstanceEntity {
    pub fn from_runtime(variable: &VariableInstanceEntity, now: DateTime<Utc>) -> Self {
        Self {
            id: variable.id.clone(),
            revision: 1,
            name: variable.name.clone(),
            value: variable.value.clone(),
            process_instance_id: variable.process_instance_id.clone(),
            execution_id: variable.execution_id.clone(),
            task_id: variable.task_id.clone(),
            create_time: now,
            last_updated_time: now,
            removed_time: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoricIdentityLinkEntity {
    pub id: String,
    pub revision: i32,
    pub link_type: IdentityLinkType,
    pub user_id: Option<String>,
    pub group_id: Option<String>,
    pub task_id: Option<String>,
    pub process_instance_id: Option<String>,
    pub create_time: DateTime<Utc>,
    pub removed_time: Option<DateTime<Utc>>,
}

impl HistoricIdentityLinkEntity {
    pub fn from_runtime(link: &IdentityLinkEntity, now: DateTime<Utc>) -> Self {
        Self {
            id: link.id.clone(),
            revision: 1,
            link_type: link.link_type,
            user_id: link.user_id.clone(),
            group_id: link.group_id.clone(),
            task_id: link.task_id.clone(),
            process_instance_id: link.process_instance_id.clone(),
            create_time: now,
            removed_time: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoricEntityLinkEntity {
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

impl From<&EntityLinkEntity> for HistoricEntityLinkEntity {
    fn from(link: &EntityLinkEntity) -> Self {
        Self {
            id: link.id.clone(),
            revision: 1,
            link_type: link.link_type.clone(),
            scope_id: link.scope_id.clone(),
            scope_type: link.scope_type.clone(),
            ref_scope_id: link.ref_scope_id.clone(),
            ref_scope_type: link.ref_scope_type.clone(),
            root_scope_id: link.root_scope_id.clone(),
            root_scope_type: link.root_scope_type.clone(),
            hierarchy_type: link.hierarchy_type.clone(),
            create_time: link.create_time,
        }
    }
}
