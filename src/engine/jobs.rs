//! Job rows of the four job kinds and moves between them.

use chrono::{DateTime, Utc};

use super::executions::count_related;
use crate::core::{EngineError, Result, new_id};
use crate::entity::{Entity, EntityKind, ExecutionEntity, ExecutionRelation, JobEntity, JobHandler};
use crate::interceptor::CommandContext;

fn relation_of(kind: EntityKind) -> Result<ExecutionRelation> {
    ExecutionRelation::for_job_kind(kind)
        .ok_or_else(|| EngineError::IllegalArgument(format!("{} is not a job kind", kind)))
}

fn new_job(
    ctx: &CommandContext,
    execution: &ExecutionEntity,
    handler: JobHandler,
    element_id: &str,
    due_date: Option<DateTime<Utc>>,
) -> JobEntity {
    JobEntity {
        id: new_id(),
        revision: 0,
        handler,
        execution_id: execution.id.clone(),
        process_instance_id: execution.process_instance_id.clone(),
        process_definition_id: execution.process_definition_id.clone(),
        element_id: element_id.to_string(),
        retries: ctx.config().async_executor_default_retries,
        due_date,
        lock_owner: None,
        lock_expiration: None,
        exception_message: None,
        create_time: ctx.now(),
    }
}

async fn insert_job(ctx: &mut CommandContext, kind: EntityKind, job: JobEntity) -> Result<String> {
    let relation = relation_of(kind)?;
    let execution_id = job.execution_id.clone();
    let entity = Entity::job(kind, job)
        .ok_or_else(|| EngineError::IllegalArgument(format!("{} is not a job kind", kind)))?;
    let id = ctx.session.insert(entity)?;
    count_related(ctx, &execution_id, relation, true).await?;
    Ok(id)
}

pub(super) async fn create_async_job(
    ctx: &mut CommandContext,
    execution: &ExecutionEntity,
    element_id: &str,
) -> Result<String> {
    let job = new_job(ctx, execution, JobHandler::AsyncContinuation, element_id, None);
    insert_job(ctx, EntityKind::Job, job).await
}

pub(crate) async fn create_timer_job(
    ctx: &mut CommandContext,
    execution: &ExecutionEntity,
    element_id: &str,
    due_date: DateTime<Utc>,
) -> Result<String> {
    let job = new_job(ctx, execution, JobHandler::TriggerTimer, element_id, Some(due_date));
    insert_job(ctx, EntityKind::TimerJob, job).await
}

pub(crate) async fn load_job(ctx: &mut CommandContext, kind: EntityKind, job_id: &str) -> Result<JobEntity> {
    ctx.session
        .load_in::<JobEntity>(kind, job_id)
        .await
        .ok_or_else(|| EngineError::not_found("job", job_id))
}

pub(crate) async fn delete_job(ctx: &mut CommandContext, kind: EntityKind, job: &JobEntity) -> Result<()> {
    let relation = relation_of(kind)?;
    ctx.session.delete(kind, &job.id)?;
    count_related(ctx, &job.execution_id, relation, false).await
}

/// Moves a job to another job kind under the same id, applying `update` to
/// the moved copy.
pub(crate) async fn move_job<F>(
    ctx: &mut CommandContext,
    job: &JobEntity,
    from: EntityKind,
    to: EntityKind,
    update: F,
) -> Result<JobEntity>
where
    F: FnOnce(&mut JobEntity) + Send,
{
    let mut moved = job.clone();
    update(&mut moved);
    delete_job(ctx, from, job).await?;
    insert_job(ctx, to, moved.clone()).await?;
    log::debug!("Moved job {} from {} to {}", job.id, from, to);
    Ok(moved)
}
