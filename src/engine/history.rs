//! Historic mirrors written alongside runtime changes, gated by the
//! configured history level.

use chrono::{DateTime, Utc};
use serde_json::json;

use super::HistoryLevel;
use crate::core::{Result, new_id};
use crate::entity::{
    ActivityInstanceEntity, CommentEntity, EntityData, EntityLinkEntity, ExecutionEntity,
    HistoricActivityInstanceEntity, HistoricEntityLinkEntity, HistoricIdentityLinkEntity,
    HistoricProcessInstanceEntity, HistoricTaskInstanceEntity, HistoricTaskLogEntryEntity,
    HistoricVariableInstanceEntity, IdentityLinkEntity, TaskEntity, VariableInstanceEntity,
};
use crate::interceptor::CommandContext;

pub(super) const TASK_CREATED: &str = "USER_TASK_CREATED";
pub(super) const TASK_COMPLETED: &str = "USER_TASK_COMPLETED";
pub(super) const TASK_DELETED: &str = "USER_TASK_DELETED";
pub(super) const TASK_ASSIGNEE_CHANGED: &str = "USER_TASK_ASSIGNEE_CHANGED";
pub(super) const TASK_IDENTITY_LINK_ADDED: &str = "USER_TASK_IDENTITY_LINK_ADDED";
pub(super) const TASK_IDENTITY_LINK_REMOVED: &str = "USER_TASK_IDENTITY_LINK_REMOVED";

fn enabled(ctx: &CommandContext, level: HistoryLevel) -> bool {
    ctx.config().history_enabled(level)
}

fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_milliseconds()
}

/// The tracked historic row, read with `selectById` when the session does
/// not know it yet.
async fn historic_mut<'a, E: EntityData>(ctx: &'a mut CommandContext, id: &str) -> Option<&'a mut E> {
    ctx.session.load_kind(E::KIND, id).await;
    ctx.session.get_mut::<E>(id)
}

// ----------------------------------------------------------------------
// Process instances and activities
// ----------------------------------------------------------------------

pub(super) fn record_process_instance_start(
    ctx: &mut CommandContext,
    instance: &ExecutionEntity,
    start_activity_id: &str,
    super_process_instance_id: Option<&str>,
) -> Result<()> {
    if !enabled(ctx, HistoryLevel::Activity) {
        return Ok(());
    }
    ctx.session.insert_data(HistoricProcessInstanceEntity {
        id: instance.id.clone(),
        revision: 0,
        process_definition_id: instance.process_definition_id.clone(),
        process_definition_key: instance.process_definition_key.clone(),
        business_key: instance.business_key.clone(),
        start_time: instance.start_time,
        end_time: None,
        duration_ms: None,
        start_activity_id: Some(start_activity_id.to_string()),
        end_activity_id: None,
        super_process_instance_id: super_process_instance_id.map(str::to_string),
        delete_reason: None,
    })?;
    Ok(())
}

pub(super) async fn record_process_instance_end(
    ctx: &mut CommandContext,
    process_instance_id: &str,
    end_activity_id: Option<&str>,
    delete_reason: Option<&str>,
) -> Result<()> {
    if !enabled(ctx, HistoryLevel::Activity) {
        return Ok(());
    }
    let now = ctx.now();
    if let Some(historic) = historic_mut::<HistoricProcessInstanceEntity>(ctx, process_instance_id).await {
        historic.end_time = Some(now);
        historic.duration_ms = Some(elapsed_ms(historic.start_time, now));
        historic.end_activity_id = end_activity_id.map(str::to_string);
        historic.delete_reason = delete_reason.map(str::to_string);
    }
    Ok(())
}

pub(super) fn record_activity_start(ctx: &mut CommandContext, activity: &ActivityInstanceEntity) -> Result<()> {
    if enabled(ctx, HistoryLevel::Activity) {
        ctx.session
            .insert_data(HistoricActivityInstanceEntity::from(activity))?;
    }
    Ok(())
}

pub(super) async fn record_activity_change(ctx: &mut CommandContext, activity: &ActivityInstanceEntity) -> Result<()> {
    if !enabled(ctx, HistoryLevel::Activity) {
        return Ok(());
    }
    if let Some(historic) = historic_mut::<HistoricActivityInstanceEntity>(ctx, &activity.id).await {
        historic.sync_from(activity);
    }
    Ok(())
}

// ----------------------------------------------------------------------
// Tasks
// ----------------------------------------------------------------------

pub(super) fn record_task_created(ctx: &mut CommandContext, task: &TaskEntity) -> Result<()> {
    if enabled(ctx, HistoryLevel::Activity) {
        ctx.session.insert_data(HistoricTaskInstanceEntity::from(task))?;
    }
    record_task_log(ctx, TASK_CREATED, task, None, json!({ "name": task.name }))
}

pub(super) async fn record_task_change(ctx: &mut CommandContext, task: &TaskEntity) -> Result<()> {
    if !enabled(ctx, HistoryLevel::Activity) {
        return Ok(());
    }
    let now = ctx.now();
    if let Some(historic) = historic_mut::<HistoricTaskInstanceEntity>(ctx, &task.id).await {
        historic.assignee = task.assignee.clone();
        historic.owner = task.owner.clone();
        historic.claim_time = task.claim_time;
        historic.last_updated_time = Some(now);
    }
    Ok(())
}

pub(super) async fn record_task_end(
    ctx: &mut CommandContext,
    task: &TaskEntity,
    delete_reason: Option<&str>,
) -> Result<()> {
    if enabled(ctx, HistoryLevel::Activity) {
        let now = ctx.now();
        if let Some(historic) = historic_mut::<HistoricTaskInstanceEntity>(ctx, &task.id).await {
            historic.end_time = Some(now);
            historic.duration_ms = Some(elapsed_ms(historic.start_time, now));
            historic.delete_reason = delete_reason.map(str::to_string);
            historic.last_updated_time = Some(now);
        }
    }
    let log_type = if delete_reason.is_some() { TASK_DELETED } else { TASK_COMPLETED };
    record_task_log(ctx, log_type, task, None, json!({ "deleteReason": delete_reason }))
}

pub(super) fn record_task_log(
    ctx: &mut CommandContext,
    log_type: &str,
    task: &TaskEntity,
    user_id: Option<&str>,
    data: serde_json::Value,
) -> Result<()> {
    if !enabled(ctx, HistoryLevel::Audit) {
        return Ok(());
    }
    let entry = HistoricTaskLogEntryEntity {
        id: new_id(),
        revision: 0,
        log_type: log_type.to_string(),
        task_id: task.id.clone(),
        process_instance_id: task.process_instance_id.clone(),
        time_stamp: ctx.now(),
        user_id: user_id.map(str::to_string),
        data,
    };
    ctx.session.insert_data(entry)?;
    Ok(())
}

pub(super) fn record_comment(
    ctx: &mut CommandContext,
    task: &TaskEntity,
    user_id: Option<&str>,
    action: &str,
    message: String,
) -> Result<()> {
    if !enabled(ctx, HistoryLevel::Audit) {
        return Ok(());
    }
    let comment = CommentEntity {
        id: new_id(),
        revision: 0,
        comment_type: "event".to_string(),
        task_id: Some(task.id.clone()),
        process_instance_id: task.process_instance_id.clone(),
        user_id: user_id.map(str::to_string),
        action: action.to_string(),
        message,
        time: ctx.now(),
    };
    ctx.session.insert_data(comment)?;
    Ok(())
}

// ----------------------------------------------------------------------
// Variables and links
// ----------------------------------------------------------------------

pub(super) fn record_variable_created(ctx: &mut CommandContext, variable: &VariableInstanceEntity) -> Result<()> {
    if enabled(ctx, HistoryLevel::Activity) {
        let now = ctx.now();
        ctx.session
            .insert_data(HistoricVariableInstanceEntity::from_runtime(variable, now))?;
    }
    Ok(())
}

pub(super) async fn record_variable_change(ctx: &mut CommandContext, variable: &VariableInstanceEntity) -> Result<()> {
    if !enabled(ctx, HistoryLevel::Activity) {
        return Ok(());
    }
    let now = ctx.now();
    if let Some(historic) = historic_mut::<HistoricVariableInstanceEntity>(ctx, &variable.id).await {
        historic.value = variable.value.clone();
        historic.last_updated_time = now;
    }
    Ok(())
}

pub(super) async fn record_variable_removed(ctx: &mut CommandContext, variable_id: &str) -> Result<()> {
    if !enabled(ctx, HistoryLevel::Activity) {
        return Ok(());
    }
    let now = ctx.now();
    if let Some(historic) = historic_mut::<HistoricVariableInstanceEntity>(ctx, variable_id).await {
        historic.removed_time = Some(now);
        historic.last_updated_time = now;
    }
    Ok(())
}

pub(super) fn record_identity_link_created(ctx: &mut CommandContext, link: &IdentityLinkEntity) -> Result<()> {
    if enabled(ctx, HistoryLevel::Audit) {
        let now = ctx.now();
        ctx.session
            .insert_data(HistoricIdentityLinkEntity::from_runtime(link, now))?;
    }
    Ok(())
}

pub(super) async fn record_identity_link_removed(ctx: &mut CommandContext, link_id: &str) -> Result<()> {
    if !enabled(ctx, HistoryLevel::Audit) {
        return Ok(());
    }
    let now = ctx.now();
    if let Some(historic) = historic_mut::<HistoricIdentityLinkEntity>(ctx, link_id).await {
        historic.removed_time = Some(now);
    }
    Ok(())
}

pub(super) fn record_entity_link(ctx: &mut CommandContext, link: &EntityLinkEntity) -> Result<()> {
    if enabled(ctx, HistoryLevel::Audit) {
        ctx.session.insert_data(HistoricEntityLinkEntity::from(link))?;
    }
    Ok(())
}
