//! Runtime activity instances: one row per element an execution entered,
//! mirrored into history.

use super::history;
use crate::core::{EngineError, Result, new_id};
use crate::entity::{ActivityInstanceEntity, EntityKind, ExecutionEntity};
use crate::interceptor::CommandContext;
use crate::model::{FlowElement, SequenceFlow};
use crate::storage::EntityQuery;

pub(super) const SEQUENCE_FLOW: &str = "sequenceFlow";

fn activity_of(ctx: &CommandContext, execution: &ExecutionEntity, activity_id: &str, activity_type: &str) -> ActivityInstanceEntity {
    ActivityInstanceEntity {
        id: new_id(),
        revision: 0,
        process_definition_id: execution.process_definition_id.clone(),
        process_instance_id: execution.process_instance_id.clone(),
        execution_id: execution.id.clone(),
        activity_id: activity_id.to_string(),
        activity_name: None,
        activity_type: activity_type.to_string(),
        task_id: None,
        called_process_instance_id: None,
        assignee: None,
        start_time: ctx.now(),
        end_time: None,
        duration_ms: None,
        delete_reason: None,
    }
}

/// Records entering `element` and returns the new activity instance id.
pub(super) fn start_activity(
    ctx: &mut CommandContext,
    execution: &ExecutionEntity,
    element: &FlowElement,
) -> Result<String> {
    let mut activity = activity_of(ctx, execution, &element.id, element.kind.type_name());
    activity.activity_name = element.name.clone();
    history::record_activity_start(ctx, &activity)?;
    ctx.session.insert_data(activity)
}

/// Sequence flows are recorded as already finished activity instances.
pub(super) fn record_sequence_flow(
    ctx: &mut CommandContext,
    execution: &ExecutionEntity,
    flow: &SequenceFlow,
) -> Result<()> {
    let mut activity = activity_of(ctx, execution, &flow.id, SEQUENCE_FLOW);
    activity.end_time = Some(activity.start_time);
    activity.duration_ms = Some(0);
    history::record_activity_start(ctx, &activity)?;
    ctx.session.insert_data(activity)?;
    Ok(())
}

/// Unfinished instances of `activity_id` on the execution. Executions
/// inserted by this session have nothing in storage, so only the cache is
/// consulted for them.
async fn unfinished(ctx: &mut CommandContext, execution_id: &str, activity_id: &str) -> Vec<ActivityInstanceEntity> {
    let query = EntityQuery::UnfinishedActivityInstanceExecutionIdAndActivityId {
        execution_id: execution_id.to_string(),
        activity_id: activity_id.to_string(),
    };
    let cached = ctx.session.find_cached_of::<ActivityInstanceEntity>(&query);
    if !cached.is_empty() || ctx.session.is_inserted(EntityKind::Execution, execution_id) {
        return cached;
    }
    ctx.session.find_list_of(&query).await
}

pub(super) async fn end_activity(
    ctx: &mut CommandContext,
    execution_id: &str,
    activity_id: &str,
    delete_reason: Option<&str>,
) -> Result<()> {
    let now = ctx.now();
    for activity in unfinished(ctx, execution_id, activity_id).await {
        update_activity(ctx, &activity.id, |activity| activity.mark_ended(now, delete_reason)).await?;
    }
    Ok(())
}

/// The activity instance that created the task, if it is still around.
pub(super) async fn activity_for_task(ctx: &mut CommandContext, task_id: &str) -> Option<ActivityInstanceEntity> {
    let query = EntityQuery::ActivityInstanceByTaskId(task_id.to_string());
    let cached = ctx.session.find_cached_of::<ActivityInstanceEntity>(&query);
    if !cached.is_empty() || ctx.session.is_inserted(EntityKind::Task, task_id) {
        return cached.into_iter().next();
    }
    ctx.session.find_list_of(&query).await.into_iter().next()
}

/// Applies `update` to a tracked activity instance and syncs its mirror.
pub(super) async fn update_activity<F>(ctx: &mut CommandContext, activity_id: &str, update: F) -> Result<()>
where
    F: FnOnce(&mut ActivityInstanceEntity) + Send,
{
    let updated = {
        let activity = ctx
            .session
            .get_mut::<ActivityInstanceEntity>(activity_id)
            .ok_or_else(|| EngineError::not_found("activity instance", activity_id))?;
        update(activity);
        activity.clone()
    };
    history::record_activity_change(ctx, &updated).await
}
