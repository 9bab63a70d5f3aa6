//! What happens when an execution enters or leaves a flow element.

use std::collections::BTreeMap;

use super::agenda::{Agenda, Operation};
use super::executions::{
    self, cancel_boundary_events, child_executions, count_related, create_child_execution,
    delete_data_for_execution, delete_execution, execution_mut, load_execution, model_of, related,
};
use super::{activities, jobs, tasks, variables};
use crate::core::{EngineError, Result, new_id};
use crate::entity::{
    EntityKind, EventSubscriptionEntity, ExecutionEntity, ExecutionRelation, JobEntity,
};
use crate::interceptor::CommandContext;
use crate::model::{ElementKind, FlowElement, ProcessModel, SequenceFlow, parse_timer_duration};
use crate::storage::EntityQuery;

pub(crate) const MESSAGE_EVENT: &str = "message";

fn current_activity(execution: &ExecutionEntity) -> Result<&str> {
    execution.activity_id.as_deref().ok_or_else(|| {
        EngineError::IllegalState(format!("execution '{}' has no current activity", execution.id))
    })
}

pub(super) async fn continue_execution(
    ctx: &mut CommandContext,
    agenda: &mut Agenda,
    execution_id: &str,
    skip_async: bool,
) -> Result<()> {
    let execution = load_execution(ctx, execution_id).await?;
    let model = model_of(ctx, &execution).await?;
    let element = model.element_or_err(current_activity(&execution)?)?;

    if element.is_async && !skip_async {
        jobs::create_async_job(ctx, &execution, &element.id).await?;
        return Ok(());
    }

    let activity_instance_id = activities::start_activity(ctx, &execution, element)?;
    if element.kind.is_wait_state() {
        create_boundary_timers(ctx, &execution, &model, &element.id).await?;
    }

    match &element.kind {
        ElementKind::StartEvent | ElementKind::EndEvent | ElementKind::BoundaryTimer { .. } => {
            agenda.plan(take_outgoing_of(execution_id, None));
        }
        ElementKind::UserTask { .. } => {
            tasks::create_task(ctx, &execution, element, &activity_instance_id).await?;
        }
        ElementKind::ServiceTask {
            variables: assigned,
            fail_with,
        } => {
            if let Some(message) = fail_with {
                return Err(EngineError::ExecutionError(format!(
                    "service task '{}' failed: {}",
                    element.id, message
                )));
            }
            variables::set_execution_variables(ctx, &execution.process_instance_id, assigned).await?;
            agenda.plan(take_outgoing_of(execution_id, None));
        }
        ElementKind::ParallelGateway => {
            join_parallel(ctx, agenda, &execution, &model, element).await?;
        }
        ElementKind::ExclusiveGateway { default_flow } => {
            let chosen = choose_exclusive_flow(ctx, &execution, &model, element, default_flow.as_deref()).await?;
            agenda.plan(take_outgoing_of(execution_id, Some(chosen)));
        }
        ElementKind::ReceiveTask => {}
        ElementKind::IntermediateMessageCatch { message } => {
            let subscription = EventSubscriptionEntity {
                id: new_id(),
                revision: 0,
                event_type: MESSAGE_EVENT.to_string(),
                event_name: message.clone(),
                execution_id: execution.id.clone(),
                process_instance_id: execution.process_instance_id.clone(),
                activity_id: element.id.clone(),
                created: ctx.now(),
            };
            ctx.session.insert_data(subscription)?;
            count_related(ctx, &execution.id, ExecutionRelation::EventSubscriptions, true).await?;
        }
        ElementKind::CallActivity { called_element } => {
            let definition = executions::latest_definition(ctx, called_element).await?;
            let sub = executions::start_process_instance(
                ctx,
                agenda,
                &definition,
                None,
                &BTreeMap::new(),
                Some(&execution),
            )
            .await?;
            activities::update_activity(ctx, &activity_instance_id, move |activity| {
                activity.called_process_instance_id = Some(sub.id)
            })
            .await?;
        }
    }
    Ok(())
}

fn take_outgoing_of(execution_id: &str, only_flow: Option<String>) -> Operation {
    Operation::TakeOutgoing {
        execution_id: execution_id.to_string(),
        only_flow,
    }
}

/// Each timer boundary event of a wait state gets its own execution, next to
/// the host, holding the timer job.
async fn create_boundary_timers(
    ctx: &mut CommandContext,
    host: &ExecutionEntity,
    model: &ProcessModel,
    activity_id: &str,
) -> Result<()> {
    let Some(parent_id) = &host.parent_id else {
        return Ok(());
    };
    for boundary in model.boundary_events(activity_id) {
        let ElementKind::BoundaryTimer { duration, .. } = &boundary.kind else {
            continue;
        };
        let due = ctx.now() + parse_timer_duration(duration)?;
        let mut execution = create_child_execution(ctx, parent_id, &boundary.id).await?;
        execution_mut(ctx, &execution.id).await?.is_active = false;
        execution.is_active = false;
        activities::start_activity(ctx, &execution, boundary)?;
        jobs::create_timer_job(ctx, &execution, &boundary.id, due).await?;
    }
    Ok(())
}

async fn join_parallel(
    ctx: &mut CommandContext,
    agenda: &mut Agenda,
    execution: &ExecutionEntity,
    model: &ProcessModel,
    gateway: &FlowElement,
) -> Result<()> {
    let incoming = model.incoming(&gateway.id).len();
    if incoming > 1 {
        let parent_id = execution.parent_id.clone().ok_or_else(|| {
            EngineError::IllegalState(format!("execution '{}' has no parent", execution.id))
        })?;
        execution_mut(ctx, &execution.id).await?.is_active = false;

        let arrived: Vec<ExecutionEntity> = child_executions(ctx, &parent_id)
            .await?
            .into_iter()
            .filter(|child| !child.is_active && child.activity_id.as_deref() == Some(gateway.id.as_str()))
            .collect();
        if arrived.len() < incoming {
            log::trace!("Gateway {} joined {}/{}", gateway.id, arrived.len(), incoming);
            return Ok(());
        }
        for other in arrived.iter().filter(|child| child.id != execution.id) {
            activities::end_activity(ctx, &other.id, &gateway.id, None).await?;
            delete_data_for_execution(ctx, agenda, &other.id, None).await?;
            delete_execution(ctx, &other.id).await?;
        }
        let joined = execution_mut(ctx, &execution.id).await?;
        joined.is_active = true;
        joined.is_concurrent = false;
    }
    agenda.plan(take_outgoing_of(&execution.id, None));
    Ok(())
}

async fn choose_exclusive_flow(
    ctx: &mut CommandContext,
    execution: &ExecutionEntity,
    model: &ProcessModel,
    gateway: &FlowElement,
    default_flow: Option<&str>,
) -> Result<String> {
    let outgoing = model.outgoing(&gateway.id);
    let variables = if outgoing.iter().any(|flow| flow.condition.is_some()) {
        variables::variable_map(ctx, &execution.process_instance_id).await?
    } else {
        BTreeMap::new()
    };
    outgoing
        .iter()
        .filter(|flow| Some(flow.id.as_str()) != default_flow)
        .find(|flow| flow.condition.as_ref().is_none_or(|condition| condition.evaluate(&variables)))
        .map(|flow| flow.id.clone())
        .or_else(|| default_flow.map(str::to_string))
        .ok_or_else(|| {
            EngineError::ExecutionError(format!(
                "no outgoing sequence flow of exclusive gateway '{}' can be selected",
                gateway.id
            ))
        })
}

/// Leaves the current activity. Without a selectable flow the execution
/// ends; with several, concurrent siblings are created for all but the
/// first.
pub(super) async fn take_outgoing(
    ctx: &mut CommandContext,
    agenda: &mut Agenda,
    execution_id: &str,
    only_flow: Option<String>,
) -> Result<()> {
    let execution = load_execution(ctx, execution_id).await?;
    let activity_id = current_activity(&execution)?.to_string();
    let model = model_of(ctx, &execution).await?;

    activities::end_activity(ctx, execution_id, &activity_id, None).await?;
    cancel_boundary_events(ctx, agenda, &execution, &activity_id, None).await?;

    let outgoing = model.outgoing(&activity_id);
    let flows: Vec<&SequenceFlow> = match &only_flow {
        Some(flow_id) => outgoing.into_iter().filter(|flow| flow.id == *flow_id).collect(),
        None => {
            let variables = if outgoing.iter().any(|flow| flow.condition.is_some()) {
                variables::variable_map(ctx, &execution.process_instance_id).await?
            } else {
                BTreeMap::new()
            };
            outgoing
                .into_iter()
                .filter(|flow| flow.condition.as_ref().is_none_or(|condition| condition.evaluate(&variables)))
                .collect()
        }
    };
    if flows.is_empty() {
        return executions::end_execution(ctx, agenda, execution_id).await;
    }

    let parent_id = execution.parent_id.clone().ok_or_else(|| {
        EngineError::IllegalState(format!("execution '{}' has no parent", execution_id))
    })?;
    let concurrent = flows.len() > 1;
    for (index, flow) in flows.iter().enumerate() {
        let target_id = if index == 0 {
            execution_id.to_string()
        } else {
            create_child_execution(ctx, &parent_id, &flow.target).await?.id
        };
        let target = {
            let target = execution_mut(ctx, &target_id).await?;
            target.activity_id = Some(flow.target.clone());
            target.is_active = true;
            target.is_concurrent = concurrent;
            target.clone()
        };
        activities::record_sequence_flow(ctx, &target, flow)?;
        agenda.plan(Operation::Continue {
            execution_id: target_id,
            skip_async: false,
        });
    }
    Ok(())
}

/// Resumes an execution waiting in a receive task or message catch event.
pub(crate) async fn trigger(ctx: &mut CommandContext, agenda: &mut Agenda, execution_id: &str) -> Result<()> {
    let execution = load_execution(ctx, execution_id).await?;
    if execution.suspended {
        return Err(EngineError::Suspended(format!("Execution '{}'", execution_id)));
    }
    let model = model_of(ctx, &execution).await?;
    let element = model.element_or_err(current_activity(&execution)?)?;
    match &element.kind {
        ElementKind::ReceiveTask => {}
        ElementKind::IntermediateMessageCatch { .. } => {
            let query = EntityQuery::EventSubscriptionsByExecution(execution_id.to_string());
            let subscriptions: Vec<EventSubscriptionEntity> =
                related(ctx, execution_id, ExecutionRelation::EventSubscriptions, query).await?;
            for subscription in subscriptions {
                ctx.session.delete(EntityKind::EventSubscription, &subscription.id)?;
                count_related(ctx, execution_id, ExecutionRelation::EventSubscriptions, false).await?;
            }
        }
        other => {
            return Err(EngineError::IllegalState(format!(
                "execution '{}' is waiting in a {} and cannot be triggered",
                execution_id,
                other.type_name()
            )));
        }
    }
    agenda.plan(take_outgoing_of(execution_id, None));
    Ok(())
}

/// Delivers a message to the execution subscribed to it.
pub(crate) async fn message_received(
    ctx: &mut CommandContext,
    agenda: &mut Agenda,
    message: &str,
    execution_id: &str,
) -> Result<()> {
    let query = EntityQuery::EventSubscriptionsByNameAndExecution {
        event_type: MESSAGE_EVENT.to_string(),
        event_name: message.to_string(),
        execution_id: Some(execution_id.to_string()),
    };
    if ctx.session.find_list(&query).await.is_empty() {
        return Err(EngineError::not_found(
            "message event subscription",
            format!("{}@{}", message, execution_id),
        ));
    }
    trigger(ctx, agenda, execution_id).await
}

/// Fires a boundary timer: an interrupting timer removes its host first,
/// then the boundary execution leaves through the timer's outgoing flows.
pub(crate) async fn fire_timer(ctx: &mut CommandContext, agenda: &mut Agenda, job: &JobEntity) -> Result<()> {
    let execution = load_execution(ctx, &job.execution_id).await?;
    let model = model_of(ctx, &execution).await?;
    let element = model.element_or_err(&job.element_id)?;
    let ElementKind::BoundaryTimer {
        attached_to,
        cancel_activity,
        ..
    } = &element.kind
    else {
        return Err(EngineError::IllegalState(format!(
            "timer job '{}' does not belong to a boundary timer",
            job.id
        )));
    };

    if *cancel_activity {
        if let Some(parent_id) = &execution.parent_id {
            let host = child_executions(ctx, parent_id)
                .await?
                .into_iter()
                .find(|child| child.id != execution.id && child.activity_id.as_deref() == Some(attached_to.as_str()));
            if let Some(host) = host {
                let reason = format!("boundary event ({})", element.id);
                activities::end_activity(ctx, &host.id, attached_to, Some(&reason)).await?;
                cancel_boundary_events(ctx, agenda, &host, attached_to, Some(&element.id)).await?;
                delete_data_for_execution(ctx, agenda, &host.id, Some(reason)).await?;
                delete_execution(ctx, &host.id).await?;
            }
        }
    }

    execution_mut(ctx, &execution.id).await?.is_active = true;
    agenda.plan(take_outgoing_of(&execution.id, None));
    Ok(())
}
