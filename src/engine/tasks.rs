//! User tasks and their identity links.

use serde_json::json;

use super::executions::{count_related, link_child_scope, load_execution, related};
use super::{activities, history, variables};
use crate::core::{EngineError, Result, new_id};
use crate::entity::{
    EntityKind, ExecutionEntity, ExecutionRelation, IdentityLinkEntity, IdentityLinkType,
    TaskCounts, TaskEntity, TaskRelation, SCOPE_TYPE_TASK,
};
use crate::interceptor::CommandContext;
use crate::model::{ElementKind, FlowElement};
use crate::storage::EntityQuery;

pub(crate) async fn load_task(ctx: &mut CommandContext, task_id: &str) -> Result<TaskEntity> {
    ctx.session
        .load::<TaskEntity>(task_id)
        .await
        .ok_or_else(|| EngineError::not_found("task", task_id))
}

fn ensure_active(task: &TaskEntity) -> Result<()> {
    if task.suspended {
        return Err(EngineError::Suspended(format!("Task '{}'", task.id)));
    }
    Ok(())
}

/// Creates the task of a user task element entered by `execution`.
pub(super) async fn create_task(
    ctx: &mut CommandContext,
    execution: &ExecutionEntity,
    element: &FlowElement,
    activity_instance_id: &str,
) -> Result<String> {
    let ElementKind::UserTask {
        assignee,
        candidate_users,
        candidate_groups,
    } = &element.kind
    else {
        return Err(EngineError::IllegalState(format!(
            "element '{}' is not a user task",
            element.id
        )));
    };

    let task = TaskEntity {
        id: new_id(),
        revision: 0,
        name: Some(element.name.clone().unwrap_or_else(|| element.id.clone())),
        task_definition_key: Some(element.id.clone()),
        execution_id: Some(execution.id.clone()),
        process_instance_id: Some(execution.process_instance_id.clone()),
        process_definition_id: Some(execution.process_definition_id.clone()),
        assignee: assignee.clone(),
        owner: None,
        claim_time: None,
        create_time: ctx.now(),
        suspended: execution.suspended,
        counts: TaskCounts::new(ctx.counting().tasks),
    };
    let task_id = ctx.session.insert_data(task.clone())?;
    count_related(ctx, &execution.id, ExecutionRelation::Tasks, true).await?;

    let (linked_task, linked_assignee) = (task_id.clone(), assignee.clone());
    activities::update_activity(ctx, activity_instance_id, move |activity| {
        activity.task_id = Some(linked_task);
        activity.assignee = linked_assignee;
    })
    .await?;
    history::record_task_created(ctx, &task)?;

    let instance = load_execution(ctx, &execution.process_instance_id).await?;
    link_child_scope(
        ctx,
        &instance.id,
        &instance.root_process_instance_id,
        &task_id,
        SCOPE_TYPE_TASK,
    )?;

    for user in candidate_users {
        insert_task_link(ctx, &task_id, Some(user), None, IdentityLinkType::Candidate)?;
    }
    for group in candidate_groups {
        insert_task_link(ctx, &task_id, None, Some(group), IdentityLinkType::Candidate)?;
    }
    for user in assignee.iter().chain(candidate_users) {
        ensure_participant(ctx, &instance.id, user).await?;
    }
    Ok(task_id)
}

/// Deletes a task with its variables and identity links, closing its
/// historic row.
pub(crate) async fn delete_task(ctx: &mut CommandContext, task_id: &str, delete_reason: Option<&str>) -> Result<()> {
    let task = load_task(ctx, task_id).await?;
    variables::delete_task_variables(ctx, &task).await?;
    for link in find_task_identity_links(ctx, &task).await? {
        ctx.session.delete(EntityKind::IdentityLink, &link.id)?;
    }
    history::record_task_end(ctx, &task, delete_reason).await?;
    ctx.session.delete(EntityKind::Task, task_id)?;
    if let Some(execution_id) = &task.execution_id {
        count_related(ctx, execution_id, ExecutionRelation::Tasks, false).await?;
    }
    Ok(())
}

pub(crate) async fn find_task_identity_links(
    ctx: &mut CommandContext,
    task: &TaskEntity,
) -> Result<Vec<IdentityLinkEntity>> {
    if ctx.counting().skip_task_lookup(&task.counts, TaskRelation::IdentityLinks) {
        return Ok(Vec::new());
    }
    let query = EntityQuery::IdentityLinksByTaskId(task.id.clone());
    if ctx.session.is_inserted(EntityKind::Task, &task.id) {
        return Ok(ctx.session.find_cached_of(&query));
    }
    Ok(ctx.session.find_list_of(&query).await)
}

async fn find_matching_links(
    ctx: &mut CommandContext,
    task: &TaskEntity,
    user_id: Option<&str>,
    group_id: Option<&str>,
    link_type: IdentityLinkType,
) -> Vec<IdentityLinkEntity> {
    if ctx.counting().skip_task_lookup(&task.counts, TaskRelation::IdentityLinks) {
        return Vec::new();
    }
    let query = EntityQuery::IdentityLinkByTaskUserGroupAndType {
        task_id: task.id.clone(),
        user_id: user_id.map(str::to_string),
        group_id: group_id.map(str::to_string),
        link_type,
    };
    if ctx.session.is_inserted(EntityKind::Task, &task.id) {
        return ctx.session.find_cached_of(&query);
    }
    ctx.session.find_list_of(&query).await
}

fn insert_task_link(
    ctx: &mut CommandContext,
    task_id: &str,
    user_id: Option<&str>,
    group_id: Option<&str>,
    link_type: IdentityLinkType,
) -> Result<()> {
    let link = IdentityLinkEntity {
        id: new_id(),
        revision: 0,
        link_type,
        user_id: user_id.map(str::to_string),
        group_id: group_id.map(str::to_string),
        task_id: Some(task_id.to_string()),
        process_instance_id: None,
    };
    history::record_identity_link_created(ctx, &link)?;
    ctx.session.insert_data(link)?;
    if let Some(task) = ctx.session.get_mut::<TaskEntity>(task_id) {
        task.counts.increment(TaskRelation::IdentityLinks);
    }
    Ok(())
}

/// Makes `user_id` a participant of the process instance unless it already is.
pub(super) async fn ensure_participant(ctx: &mut CommandContext, process_instance_id: &str, user_id: &str) -> Result<()> {
    let query = EntityQuery::IdentityLinksByProcessInstance(process_instance_id.to_string());
    let existing: Vec<IdentityLinkEntity> =
        related(ctx, process_instance_id, ExecutionRelation::IdentityLinks, query).await?;
    if existing
        .iter()
        .any(|link| link.link_type == IdentityLinkType::Participant && link.user_id.as_deref() == Some(user_id))
    {
        return Ok(());
    }
    let link = IdentityLinkEntity {
        id: new_id(),
        revision: 0,
        link_type: IdentityLinkType::Participant,
        user_id: Some(user_id.to_string()),
        group_id: None,
        task_id: None,
        process_instance_id: Some(process_instance_id.to_string()),
    };
    history::record_identity_link_created(ctx, &link)?;
    ctx.session.insert_data(link)?;
    count_related(ctx, process_instance_id, ExecutionRelation::IdentityLinks, true).await
}

fn link_target(user_id: Option<&str>, group_id: Option<&str>) -> Result<()> {
    match (user_id, group_id) {
        (Some(_), None) | (None, Some(_)) => Ok(()),
        _ => Err(EngineError::IllegalArgument(
            "exactly one of userId or groupId must be provided".to_string(),
        )),
    }
}

fn link_comment(user_id: Option<&str>, group_id: Option<&str>, link_type: IdentityLinkType, added: bool) -> (&'static str, String) {
    let action = match (user_id.is_some(), added) {
        (true, true) => "AddUserLink",
        (true, false) => "DeleteUserLink",
        (false, true) => "AddGroupLink",
        (false, false) => "DeleteGroupLink",
    };
    let target = user_id.or(group_id).unwrap_or_default();
    (action, format!("{}_|_{}", target, link_type.as_str()))
}

fn link_log_data(user_id: Option<&str>, group_id: Option<&str>, link_type: IdentityLinkType) -> serde_json::Value {
    json!({ "type": link_type.as_str(), "userId": user_id, "groupId": group_id })
}

/// Adds a user or group link to a task. Returns false when an identical
/// link already exists.
pub(crate) async fn add_identity_link(
    ctx: &mut CommandContext,
    task_id: &str,
    user_id: Option<&str>,
    group_id: Option<&str>,
    link_type: IdentityLinkType,
) -> Result<bool> {
    link_target(user_id, group_id)?;
    let task = load_task(ctx, task_id).await?;
    ensure_active(&task)?;
    if !find_matching_links(ctx, &task, user_id, group_id, link_type)
        .await
        .is_empty()
    {
        return Ok(false);
    }

    insert_task_link(ctx, task_id, user_id, group_id, link_type)?;
    if let (Some(user), Some(process_instance_id)) = (user_id, &task.process_instance_id) {
        ensure_participant(ctx, process_instance_id, user).await?;
    }
    let (action, message) = link_comment(user_id, group_id, link_type, true);
    history::record_comment(ctx, &task, user_id, action, message)?;
    history::record_task_log(
        ctx,
        history::TASK_IDENTITY_LINK_ADDED,
        &task,
        user_id,
        link_log_data(user_id, group_id, link_type),
    )?;
    Ok(true)
}

/// Removes matching user or group links from a task. Returns false when
/// there was nothing to remove.
pub(crate) async fn delete_identity_link(
    ctx: &mut CommandContext,
    task_id: &str,
    user_id: Option<&str>,
    group_id: Option<&str>,
    link_type: IdentityLinkType,
) -> Result<bool> {
    link_target(user_id, group_id)?;
    let task = load_task(ctx, task_id).await?;
    ensure_active(&task)?;
    let links = find_matching_links(ctx, &task, user_id, group_id, link_type).await;
    if links.is_empty() {
        return Ok(false);
    }
    for link in &links {
        ctx.session.delete(EntityKind::IdentityLink, &link.id)?;
        history::record_identity_link_removed(ctx, &link.id).await?;
        if let Some(task) = ctx.session.get_mut::<TaskEntity>(task_id) {
            task.counts.decrement(TaskRelation::IdentityLinks);
        }
    }
    let (action, message) = link_comment(user_id, group_id, link_type, false);
    history::record_comment(ctx, &task, user_id, action, message)?;
    history::record_task_log(
        ctx,
        history::TASK_IDENTITY_LINK_REMOVED,
        &task,
        user_id,
        link_log_data(user_id, group_id, link_type),
    )?;
    Ok(true)
}

/// Sets or clears the assignee. Claiming a task owned by someone else fails.
pub(crate) async fn claim_task(ctx: &mut CommandContext, task_id: &str, user_id: Option<&str>) -> Result<()> {
    let task = load_task(ctx, task_id).await?;
    ensure_active(&task)?;
    match (user_id, task.assignee.as_deref()) {
        (Some(user), Some(current)) if user == current => return Ok(()),
        (Some(_), Some(current)) => {
            return Err(EngineError::TaskAlreadyClaimed {
                task_id: task_id.to_string(),
                assignee: current.to_string(),
            });
        }
        (None, None) => return Ok(()),
        _ => {}
    }

    let now = ctx.now();
    let updated = {
        let task = ctx
            .session
            .get_mut::<TaskEntity>(task_id)
            .ok_or_else(|| EngineError::not_found("task", task_id))?;
        task.assignee = user_id.map(str::to_string);
        task.claim_time = user_id.map(|_| now);
        task.clone()
    };
    history::record_task_change(ctx, &updated).await?;
    history::record_task_log(
        ctx,
        history::TASK_ASSIGNEE_CHANGED,
        &updated,
        user_id,
        json!({ "newAssigneeId": user_id, "previousAssigneeId": task.assignee }),
    )?;
    let changed = user_id.or(task.assignee.as_deref());
    let (action, message) = link_comment(changed, None, IdentityLinkType::Assignee, user_id.is_some());
    history::record_comment(ctx, &updated, user_id, action, message)?;

    if let (Some(user), Some(process_instance_id)) = (user_id, &task.process_instance_id) {
        ensure_participant(ctx, process_instance_id, user).await?;
    }
    if let Some(activity) = activities::activity_for_task(ctx, task_id).await {
        let assignee = user_id.map(str::to_string);
        activities::update_activity(ctx, &activity.id, move |activity| activity.assignee = assignee).await?;
    }
    Ok(())
}
