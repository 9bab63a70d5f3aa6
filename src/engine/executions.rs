//! Execution tree lifecycle: starting process instances, creating and
//! removing child executions, and ending whole instances.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_recursion::async_recursion;

use super::agenda::{Agenda, Operation};
use super::{activities, history, jobs, tasks, variables};
use crate::core::{EngineError, Result, VariableValue, new_id};
use crate::entity::{
    EntityData, EntityKind, EntityLinkEntity, EventSubscriptionEntity, ExecutionCounts,
    ExecutionEntity, ExecutionRelation, IdentityLinkEntity, JobEntity, JobHandler,
    ProcessDefinitionEntity, TaskEntity, ENTITY_LINK_TYPE_CHILD, SCOPE_TYPE_BPMN,
};
use crate::interceptor::CommandContext;
use crate::model::{ElementKind, ProcessModel};
use crate::storage::{BulkDelete, EntityQuery};

const JOB_KINDS: [EntityKind; 4] = [
    EntityKind::Job,
    EntityKind::TimerJob,
    EntityKind::SuspendedJob,
    EntityKind::DeadLetterJob,
];

pub(crate) async fn load_execution(ctx: &mut CommandContext, id: &str) -> Result<ExecutionEntity> {
    ctx.session
        .load::<ExecutionEntity>(id)
        .await
        .ok_or_else(|| EngineError::not_found("execution", id))
}

pub(crate) async fn execution_mut<'a>(ctx: &'a mut CommandContext, id: &str) -> Result<&'a mut ExecutionEntity> {
    ctx.session.load_kind(EntityKind::Execution, id).await;
    ctx.session
        .get_mut::<ExecutionEntity>(id)
        .ok_or_else(|| EngineError::not_found("execution", id))
}

pub(super) async fn model_of(ctx: &mut CommandContext, execution: &ExecutionEntity) -> Result<Arc<ProcessModel>> {
    let core = ctx.core().clone();
    core.deployments()
        .model(&mut ctx.session, &execution.process_definition_id)
        .await
}

/// Highest deployed version of the definition with the given key.
pub(crate) async fn latest_definition(ctx: &mut CommandContext, key: &str) -> Result<ProcessDefinitionEntity> {
    let query = EntityQuery::LatestProcessDefinitionByKey(key.to_string());
    ctx.session
        .find_list_of::<ProcessDefinitionEntity>(&query)
        .await
        .into_iter()
        .max_by_key(|definition| definition.version)
        .ok_or_else(|| EngineError::not_found("process definition", key))
}

/// Adjusts a relationship count. Removals on executions that are already
/// gone are ignored.
pub(super) async fn count_related(
    ctx: &mut CommandContext,
    execution_id: &str,
    relation: ExecutionRelation,
    added: bool,
) -> Result<()> {
    ctx.session.load_kind(EntityKind::Execution, execution_id).await;
    match ctx.session.get_mut::<ExecutionEntity>(execution_id) {
        Some(execution) if added => execution.counts.increment(relation),
        Some(execution) => execution.counts.decrement(relation),
        None if added => return Err(EngineError::not_found("execution", execution_id)),
        None => {}
    }
    Ok(())
}

/// Rows related to an execution. A zero count proves there are none, and an
/// execution inserted by this session can only have related rows in the
/// session cache.
pub(super) async fn related<E: EntityData>(
    ctx: &mut CommandContext,
    execution_id: &str,
    relation: ExecutionRelation,
    query: EntityQuery,
) -> Result<Vec<E>> {
    let execution = load_execution(ctx, execution_id).await?;
    if ctx.counting().skip_execution_lookup(&execution.counts, relation) {
        return Ok(Vec::new());
    }
    if ctx.session.is_inserted(EntityKind::Execution, execution_id) {
        return Ok(ctx.session.find_cached_of(&query));
    }
    Ok(ctx.session.find_list_of(&query).await)
}

pub(super) async fn child_executions(ctx: &mut CommandContext, parent_id: &str) -> Result<Vec<ExecutionEntity>> {
    let parent = load_execution(ctx, parent_id).await?;
    let query = EntityQuery::ExecutionsByParentExecutionId(parent_id.to_string());
    if ctx.session.is_inserted(EntityKind::Execution, parent_id)
        || ctx.session.is_tree_fetched(&parent.root_process_instance_id)
    {
        return Ok(ctx.session.find_cached_of(&query));
    }
    if ctx
        .counting()
        .skip_execution_lookup(&parent.counts, ExecutionRelation::ChildExecutions)
    {
        return Ok(Vec::new());
    }
    Ok(ctx.session.find_list_of(&query).await)
}

pub(super) async fn create_child_execution(
    ctx: &mut CommandContext,
    parent_id: &str,
    activity_id: &str,
) -> Result<ExecutionEntity> {
    let parent = load_execution(ctx, parent_id).await?;
    let child = ExecutionEntity {
        id: new_id(),
        revision: 0,
        process_definition_id: parent.process_definition_id.clone(),
        process_definition_key: parent.process_definition_key.clone(),
        process_instance_id: parent.process_instance_id.clone(),
        root_process_instance_id: parent.root_process_instance_id.clone(),
        parent_id: Some(parent.id.clone()),
        super_execution_id: None,
        activity_id: Some(activity_id.to_string()),
        business_key: None,
        is_active: true,
        is_concurrent: false,
        is_scope: false,
        is_ended: false,
        suspended: parent.suspended,
        start_time: ctx.now(),
        counts: ExecutionCounts::new(ctx.counting().executions),
    };
    ctx.session.insert_data(child.clone())?;
    count_related(ctx, parent_id, ExecutionRelation::ChildExecutions, true).await?;
    Ok(child)
}

/// Links a new child scope to its parent process instance and, when that
/// is not the root, to the root as well.
pub(super) fn link_child_scope(
    ctx: &mut CommandContext,
    parent_scope_id: &str,
    root_scope_id: &str,
    ref_scope_id: &str,
    ref_scope_type: &str,
) -> Result<()> {
    let mut scopes = vec![parent_scope_id];
    if root_scope_id != parent_scope_id {
        scopes.push(root_scope_id);
    }
    for scope_id in scopes {
        let hierarchy = if scope_id == root_scope_id { "root" } else { "parent" };
        let link = EntityLinkEntity {
            id: new_id(),
            revision: 0,
            link_type: ENTITY_LINK_TYPE_CHILD.to_string(),
            scope_id: scope_id.to_string(),
            scope_type: SCOPE_TYPE_BPMN.to_string(),
            ref_scope_id: ref_scope_id.to_string(),
            ref_scope_type: ref_scope_type.to_string(),
            root_scope_id: root_scope_id.to_string(),
            root_scope_type: SCOPE_TYPE_BPMN.to_string(),
            hierarchy_type: Some(hierarchy.to_string()),
            create_time: ctx.now(),
        };
        history::record_entity_link(ctx, &link)?;
        ctx.session.insert_data(link)?;
    }
    Ok(())
}

/// Creates the process instance and the execution waiting at its start
/// event, and plans entering the start event.
pub(crate) async fn start_process_instance(
    ctx: &mut CommandContext,
    agenda: &mut Agenda,
    definition: &ProcessDefinitionEntity,
    business_key: Option<String>,
    variables: &BTreeMap<String, VariableValue>,
    super_execution: Option<&ExecutionEntity>,
) -> Result<ExecutionEntity> {
    if definition.suspended {
        return Err(EngineError::Suspended(format!(
            "Process definition '{}'",
            definition.id
        )));
    }
    let model = ctx.core().deployments().resolve(definition)?;
    let start = model.start_event()?;

    let id = new_id();
    let root = super_execution
        .map(|execution| execution.root_process_instance_id.clone())
        .unwrap_or_else(|| id.clone());
    let instance = ExecutionEntity {
        id: id.clone(),
        revision: 0,
        process_definition_id: definition.id.clone(),
        process_definition_key: definition.key.clone(),
        process_instance_id: id.clone(),
        root_process_instance_id: root.clone(),
        parent_id: None,
        super_execution_id: super_execution.map(|execution| execution.id.clone()),
        activity_id: None,
        business_key,
        is_active: true,
        is_concurrent: false,
        is_scope: true,
        is_ended: false,
        suspended: false,
        start_time: ctx.now(),
        counts: ExecutionCounts::new(ctx.counting().executions),
    };
    ctx.session.insert_data(instance.clone())?;
    history::record_process_instance_start(
        ctx,
        &instance,
        &start.id,
        super_execution.map(|execution| execution.process_instance_id.as_str()),
    )?;
    if let Some(parent) = super_execution {
        link_child_scope(ctx, &parent.process_instance_id, &root, &id, SCOPE_TYPE_BPMN)?;
    }

    variables::set_execution_variables(ctx, &id, variables).await?;

    let child = create_child_execution(ctx, &id, &start.id).await?;
    agenda.plan(Operation::Continue {
        execution_id: child.id,
        skip_async: false,
    });
    log::debug!("Started process instance {} of {}", id, definition.id);
    Ok(instance)
}

async fn sub_process_instances(ctx: &mut CommandContext, execution_id: &str) -> Vec<ExecutionEntity> {
    let query = EntityQuery::SubProcessInstanceBySuperExecutionId(execution_id.to_string());
    if ctx.session.is_inserted(EntityKind::Execution, execution_id) {
        return ctx.session.find_cached_of(&query);
    }
    ctx.session.find_list_of(&query).await
}

/// Removes everything that references the execution, so that the
/// execution row itself can be deleted afterwards.
pub(super) async fn delete_data_for_execution(
    ctx: &mut CommandContext,
    agenda: &mut Agenda,
    execution_id: &str,
    delete_reason: Option<String>,
) -> Result<()> {
    let execution = load_execution(ctx, execution_id).await?;

    if let Some(activity_id) = &execution.activity_id {
        let model = model_of(ctx, &execution).await?;
        if matches!(
            model.element(activity_id).map(|element| &element.kind),
            Some(ElementKind::CallActivity { .. })
        ) {
            for sub in sub_process_instances(ctx, execution_id).await {
                let reason = delete_reason
                    .clone()
                    .or_else(|| Some("parent execution deleted".to_string()));
                end_process_instance(ctx, agenda, &sub.id, None, reason).await?;
            }
        }
    }

    let task_query = EntityQuery::TasksByExecutionId(execution_id.to_string());
    for task in related::<TaskEntity>(ctx, execution_id, ExecutionRelation::Tasks, task_query).await? {
        tasks::delete_task(ctx, &task.id, delete_reason.as_deref()).await?;
    }

    for kind in JOB_KINDS {
        let Some(relation) = ExecutionRelation::for_job_kind(kind) else {
            continue;
        };
        let query = EntityQuery::JobsByExecutionId {
            kind,
            execution_id: execution_id.to_string(),
        };
        for job in related::<JobEntity>(ctx, execution_id, relation, query).await? {
            ctx.session.delete(kind, &job.id)?;
        }
    }

    for variable in variables::variables_of_execution(ctx, execution_id).await? {
        ctx.session.delete(EntityKind::VariableInstance, &variable.id)?;
    }

    let subscription_query = EntityQuery::EventSubscriptionsByExecution(execution_id.to_string());
    for subscription in related::<EventSubscriptionEntity>(
        ctx,
        execution_id,
        ExecutionRelation::EventSubscriptions,
        subscription_query,
    )
    .await?
    {
        ctx.session.delete(EntityKind::EventSubscription, &subscription.id)?;
    }

    if execution.is_process_instance() {
        let link_query = EntityQuery::IdentityLinksByProcessInstance(execution_id.to_string());
        for link in related::<IdentityLinkEntity>(ctx, execution_id, ExecutionRelation::IdentityLinks, link_query)
            .await?
        {
            ctx.session.delete(EntityKind::IdentityLink, &link.id)?;
        }
    }
    Ok(())
}

/// Deletes a non-root execution row and lowers its parent's child count.
pub(super) async fn delete_execution(ctx: &mut CommandContext, execution_id: &str) -> Result<()> {
    let execution = load_execution(ctx, execution_id).await?;
    ctx.session.delete(EntityKind::Execution, execution_id)?;
    if let Some(parent_id) = &execution.parent_id {
        count_related(ctx, parent_id, ExecutionRelation::ChildExecutions, false).await?;
    }
    Ok(())
}

/// Removes a finished child execution, ending the process instance once its
/// last child is gone.
pub(super) async fn end_execution(ctx: &mut CommandContext, agenda: &mut Agenda, execution_id: &str) -> Result<()> {
    let execution = load_execution(ctx, execution_id).await?;
    let Some(parent_id) = execution.parent_id.clone() else {
        return end_process_instance(ctx, agenda, execution_id, execution.activity_id.clone(), None).await;
    };

    delete_data_for_execution(ctx, agenda, execution_id, None).await?;
    delete_execution(ctx, execution_id).await?;

    if child_executions(ctx, &parent_id).await?.is_empty() {
        let parent = load_execution(ctx, &parent_id).await?;
        if parent.is_process_instance() {
            end_process_instance(ctx, agenda, &parent_id, execution.activity_id.clone(), None).await?;
        }
    }
    Ok(())
}

/// Ends a process instance: its children, their data, activity instances,
/// entity links of a root instance, and finally the instance row. A
/// completed sub process instance resumes its super execution.
#[async_recursion]
pub(crate) async fn end_process_instance(
    ctx: &mut CommandContext,
    agenda: &mut Agenda,
    process_instance_id: &str,
    end_activity_id: Option<String>,
    delete_reason: Option<String>,
) -> Result<()> {
    let instance = load_execution(ctx, process_instance_id).await?;

    for child in child_executions(ctx, process_instance_id).await? {
        if let Some(activity_id) = &child.activity_id {
            activities::end_activity(ctx, &child.id, activity_id, delete_reason.as_deref()).await?;
        }
        delete_data_for_execution(ctx, agenda, &child.id, delete_reason.clone()).await?;
        delete_execution(ctx, &child.id).await?;
    }
    delete_data_for_execution(ctx, agenda, process_instance_id, delete_reason.clone()).await?;

    let inserted = ctx.session.is_inserted(EntityKind::Execution, process_instance_id);
    let mut statements = vec![
        BulkDelete::TasksByExecutionId(process_instance_id.to_string()),
        BulkDelete::ActivityInstancesByProcessInstanceId(process_instance_id.to_string()),
    ];
    if instance.root_process_instance_id == instance.id {
        statements.push(BulkDelete::EntityLinksByRootScopeIdAndRootScopeType {
            root_scope_id: instance.id.clone(),
            root_scope_type: SCOPE_TYPE_BPMN.to_string(),
        });
    }
    for statement in statements {
        if inserted {
            ctx.session.delete_tracked(&statement)?;
        } else {
            ctx.session.bulk_delete(statement);
        }
    }

    history::record_process_instance_end(
        ctx,
        process_instance_id,
        end_activity_id.as_deref(),
        delete_reason.as_deref(),
    )
    .await?;
    ctx.session.delete(EntityKind::Execution, process_instance_id)?;
    log::debug!(
        "Ended process instance {}{}",
        process_instance_id,
        delete_reason
            .as_deref()
            .map(|reason| format!(" ({})", reason))
            .unwrap_or_default()
    );

    if let (Some(super_execution_id), None) = (&instance.super_execution_id, &delete_reason) {
        agenda.plan(Operation::TakeOutgoing {
            execution_id: super_execution_id.clone(),
            only_flow: None,
        });
    }
    Ok(())
}

/// Cancels the boundary event executions waiting on `activity_id`, except
/// the one named by `except`.
pub(super) async fn cancel_boundary_events(
    ctx: &mut CommandContext,
    agenda: &mut Agenda,
    execution: &ExecutionEntity,
    activity_id: &str,
    except: Option<&str>,
) -> Result<()> {
    let model = model_of(ctx, execution).await?;
    let boundaries: Vec<String> = model
        .boundary_events(activity_id)
        .into_iter()
        .map(|boundary| boundary.id.clone())
        .filter(|id| Some(id.as_str()) != except)
        .collect();
    if boundaries.is_empty() {
        return Ok(());
    }
    let Some(parent_id) = &execution.parent_id else {
        return Ok(());
    };
    let reason = format!("boundary event cancelled: {} completed", activity_id);
    for sibling in child_executions(ctx, parent_id).await? {
        let Some(boundary_id) = &sibling.activity_id else {
            continue;
        };
        if sibling.id == execution.id || !boundaries.contains(boundary_id) {
            continue;
        }
        activities::end_activity(ctx, &sibling.id, boundary_id, Some(&reason)).await?;
        delete_data_for_execution(ctx, agenda, &sibling.id, Some(reason.clone())).await?;
        delete_execution(ctx, &sibling.id).await?;
    }
    Ok(())
}

/// Suspends or activates a process instance: its executions and tasks are
/// flagged, executable and timer jobs move to the suspended job table and
/// back.
pub(crate) async fn set_suspension_state(
    ctx: &mut CommandContext,
    process_instance_id: &str,
    suspended: bool,
) -> Result<()> {
    let instance = load_execution(ctx, process_instance_id).await?;
    if !instance.is_process_instance() {
        return Err(EngineError::IllegalArgument(format!(
            "execution '{}' is not a process instance",
            process_instance_id
        )));
    }
    if instance.suspended == suspended {
        return Err(EngineError::IllegalState(format!(
            "Process instance '{}' is already {}",
            process_instance_id,
            if suspended { "suspended" } else { "active" }
        )));
    }

    let mut execution_ids = vec![instance.id.clone()];
    execution_ids.extend(
        child_executions(ctx, process_instance_id)
            .await?
            .into_iter()
            .map(|child| child.id),
    );
    for execution_id in &execution_ids {
        execution_mut(ctx, execution_id).await?.suspended = suspended;

        let task_query = EntityQuery::TasksByExecutionId(execution_id.clone());
        for task in related::<TaskEntity>(ctx, execution_id, ExecutionRelation::Tasks, task_query).await? {
            if let Some(task) = ctx.session.get_mut::<TaskEntity>(&task.id) {
                task.suspended = suspended;
            }
        }

        let from_kinds: &[EntityKind] = if suspended {
            &[EntityKind::Job, EntityKind::TimerJob]
        } else {
            &[EntityKind::SuspendedJob]
        };
        for &from in from_kinds {
            let Some(relation) = ExecutionRelation::for_job_kind(from) else {
                continue;
            };
            let query = EntityQuery::JobsByExecutionId {
                kind: from,
                execution_id: execution_id.clone(),
            };
            for job in related::<JobEntity>(ctx, execution_id, relation, query).await? {
                let to = match (suspended, job.handler) {
                    (true, _) => EntityKind::SuspendedJob,
                    (false, JobHandler::TriggerTimer) => EntityKind::TimerJob,
                    (false, JobHandler::AsyncContinuation) => EntityKind::Job,
                };
                jobs::move_job(ctx, &job, from, to, |moved| {
                    moved.lock_owner = None;
                    moved.lock_expiration = None;
                })
                .await?;
            }
        }
    }
    log::debug!(
        "Process instance {} {}",
        process_instance_id,
        if suspended { "suspended" } else { "activated" }
    );
    Ok(())
}
