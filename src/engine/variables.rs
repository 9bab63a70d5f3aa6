//! Execution and task variables.

use std::collections::BTreeMap;

use super::executions::{count_related, load_execution, related};
use super::{history, tasks};
use crate::core::{EngineError, Result, VariableValue, new_id};
use crate::entity::{EntityKind, ExecutionRelation, TaskEntity, TaskRelation, VariableInstanceEntity};
use crate::interceptor::CommandContext;
use crate::storage::{EntityQuery, VariableScope};

pub(crate) async fn variables_of_execution(
    ctx: &mut CommandContext,
    execution_id: &str,
) -> Result<Vec<VariableInstanceEntity>> {
    let query = EntityQuery::VariablesByQuery(VariableScope::Execution(execution_id.to_string()));
    related(ctx, execution_id, ExecutionRelation::Variables, query).await
}

pub(super) async fn variable_map(
    ctx: &mut CommandContext,
    execution_id: &str,
) -> Result<BTreeMap<String, VariableValue>> {
    Ok(variables_of_execution(ctx, execution_id)
        .await?
        .into_iter()
        .map(|variable| (variable.name, variable.value))
        .collect())
}

async fn update_value(ctx: &mut CommandContext, variable_id: &str, value: &VariableValue) -> Result<()> {
    let updated = {
        let variable = ctx
            .session
            .get_mut::<VariableInstanceEntity>(variable_id)
            .ok_or_else(|| EngineError::not_found("variable", variable_id))?;
        if variable.value == *value {
            return Ok(());
        }
        variable.value = value.clone();
        variable.clone()
    };
    history::record_variable_change(ctx, &updated).await
}

/// Creates or updates variables on an execution.
pub(crate) async fn set_execution_variables(
    ctx: &mut CommandContext,
    execution_id: &str,
    variables: &BTreeMap<String, VariableValue>,
) -> Result<()> {
    if variables.is_empty() {
        return Ok(());
    }
    let execution = load_execution(ctx, execution_id).await?;
    let existing = variables_of_execution(ctx, execution_id).await?;
    for (name, value) in variables {
        match existing.iter().find(|variable| variable.name == *name) {
            Some(variable) => update_value(ctx, &variable.id, value).await?,
            None => {
                let variable = VariableInstanceEntity {
                    id: new_id(),
                    revision: 0,
                    name: name.clone(),
                    value: value.clone(),
                    execution_id: Some(execution_id.to_string()),
                    process_instance_id: Some(execution.process_instance_id.clone()),
                    task_id: None,
                };
                history::record_variable_created(ctx, &variable)?;
                ctx.session.insert_data(variable)?;
                count_related(ctx, execution_id, ExecutionRelation::Variables, true).await?;
            }
        }
    }
    Ok(())
}

/// Task-local variables, skipping the lookup when the task's count proves
/// there are none.
pub(crate) async fn find_task_variables(
    ctx: &mut CommandContext,
    task: &TaskEntity,
) -> Result<Vec<VariableInstanceEntity>> {
    if ctx.counting().skip_task_lookup(&task.counts, TaskRelation::Variables) {
        return Ok(Vec::new());
    }
    let query = EntityQuery::VariablesByQuery(VariableScope::Task(task.id.clone()));
    if ctx.session.is_inserted(EntityKind::Task, &task.id) {
        return Ok(ctx.session.find_cached_of(&query));
    }
    Ok(ctx.session.find_list_of(&query).await)
}

fn count_task_variable(ctx: &mut CommandContext, task_id: &str, added: bool) {
    if let Some(task) = ctx.session.get_mut::<TaskEntity>(task_id) {
        if added {
            task.counts.increment(TaskRelation::Variables);
        } else {
            task.counts.decrement(TaskRelation::Variables);
        }
    }
}

pub(crate) async fn set_task_variables(
    ctx: &mut CommandContext,
    task_id: &str,
    variables: &BTreeMap<String, VariableValue>,
) -> Result<()> {
    let task = tasks::load_task(ctx, task_id).await?;
    if variables.is_empty() {
        return Ok(());
    }
    let existing = find_task_variables(ctx, &task).await?;
    for (name, value) in variables {
        match existing.iter().find(|variable| variable.name == *name) {
            Some(variable) => update_value(ctx, &variable.id, value).await?,
            None => {
                let variable = VariableInstanceEntity {
                    id: new_id(),
                    revision: 0,
                    name: name.clone(),
                    value: value.clone(),
                    execution_id: task.execution_id.clone(),
                    process_instance_id: task.process_instance_id.clone(),
                    task_id: Some(task.id.clone()),
                };
                history::record_variable_created(ctx, &variable)?;
                ctx.session.insert_data(variable)?;
                count_task_variable(ctx, task_id, true);
            }
        }
    }
    Ok(())
}

/// Removes the named task-local variables and returns how many existed.
pub(crate) async fn remove_task_variables(
    ctx: &mut CommandContext,
    task_id: &str,
    names: &[String],
) -> Result<usize> {
    let task = tasks::load_task(ctx, task_id).await?;
    let mut removed = 0;
    for variable in find_task_variables(ctx, &task).await? {
        if !names.contains(&variable.name) {
            continue;
        }
        ctx.session.delete(EntityKind::VariableInstance, &variable.id)?;
        history::record_variable_removed(ctx, &variable.id).await?;
        count_task_variable(ctx, task_id, false);
        removed += 1;
    }
    Ok(removed)
}

/// Deletes all task-local variables of a task that is about to be deleted.
pub(super) async fn delete_task_variables(ctx: &mut CommandContext, task: &TaskEntity) -> Result<()> {
    for variable in find_task_variables(ctx, task).await? {
        ctx.session.delete(EntityKind::VariableInstance, &variable.id)?;
    }
    Ok(())
}
