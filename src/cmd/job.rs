use std::time::Duration;

use async_trait::async_trait;

use super::{job_command, require_id};
use crate::core::{EngineError, Result};
use crate::engine::{Agenda, Operation, delete_job, fire_timer, load_job, move_job};
use crate::entity::{EntityKind, JobEntity, JobHandler};
use crate::interceptor::{Command, CommandContext};
use crate::storage::EntityQuery;

/// Runs one executable job: the row is removed and its handler continues
/// the process.
pub struct ExecuteJobCmd {
    job_id: String,
}

impl ExecuteJobCmd {
    pub fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
        }
    }
}

#[async_trait]
impl Command for ExecuteJobCmd {
    type Output = ();

    fn name(&self) -> &'static str {
        job_command!("ExecuteJobCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<()> {
        require_id("jobId", &self.job_id)?;
        let job = load_job(ctx, EntityKind::Job, &self.job_id).await?;
        delete_job(ctx, EntityKind::Job, &job).await?;

        let mut agenda = Agenda::new();
        match job.handler {
            JobHandler::AsyncContinuation => agenda.plan(Operation::Continue {
                execution_id: job.execution_id.clone(),
                skip_async: true,
            }),
            JobHandler::TriggerTimer => fire_timer(ctx, &mut agenda, &job).await?,
        }
        agenda.run(ctx).await
    }
}

/// Records a failed execution. Out of retries, the job becomes a dead
/// letter job.
pub struct JobRetryCmd {
    job_id: String,
    exception_message: String,
}

impl JobRetryCmd {
    pub fn new(job_id: &str, exception_message: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            exception_message: exception_message.to_string(),
        }
    }
}

#[async_trait]
impl Command for JobRetryCmd {
    /// The job after the retry bookkeeping, in its new table.
    type Output = (EntityKind, JobEntity);

    fn name(&self) -> &'static str {
        job_command!("JobRetryCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<(EntityKind, JobEntity)> {
        require_id("jobId", &self.job_id)?;
        let job = load_job(ctx, EntityKind::Job, &self.job_id).await?;
        let retries = (job.retries - 1).max(0);
        let message = self.exception_message.clone();
        let failed = move |job: &mut JobEntity| {
            job.retries = retries;
            job.exception_message = Some(message);
            job.lock_owner = None;
            job.lock_expiration = None;
        };

        if retries == 0 {
            let moved = move_job(ctx, &job, EntityKind::Job, EntityKind::DeadLetterJob, failed).await?;
            log::warn!("Job {} has no retries left and became a dead letter job", job.id);
            return Ok((EntityKind::DeadLetterJob, moved));
        }
        let updated = ctx
            .session
            .get_mut_in::<JobEntity>(EntityKind::Job, &job.id)
            .ok_or_else(|| EngineError::not_found("job", &job.id))?;
        failed(updated);
        Ok((EntityKind::Job, updated.clone()))
    }
}

pub struct MoveTimerToExecutableJobCmd {
    job_id: String,
}

impl MoveTimerToExecutableJobCmd {
    pub fn new(job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
        }
    }
}

#[async_trait]
impl Command for MoveTimerToExecutableJobCmd {
    type Output = JobEntity;

    fn name(&self) -> &'static str {
        job_command!("MoveTimerToExecutableJobCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<JobEntity> {
        require_id("jobId", &self.job_id)?;
        let job = load_job(ctx, EntityKind::TimerJob, &self.job_id).await?;
        move_job(ctx, &job, EntityKind::TimerJob, EntityKind::Job, |_| {}).await
    }
}

pub struct MoveDeadLetterJobToExecutableJobCmd {
    job_id: String,
    retries: i32,
}

impl MoveDeadLetterJobToExecutableJobCmd {
    pub fn new(job_id: &str, retries: i32) -> Self {
        Self {
            job_id: job_id.to_string(),
            retries,
        }
    }
}

#[async_trait]
impl Command for MoveDeadLetterJobToExecutableJobCmd {
    type Output = JobEntity;

    fn name(&self) -> &'static str {
        job_command!("MoveDeadLetterJobToExecutableJobCmd")
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<JobEntity> {
        require_id("jobId", &self.job_id)?;
        if self.retries < 1 {
            return Err(EngineError::IllegalArgument("retries must be at least 1".into()));
        }
        let job = load_job(ctx, EntityKind::DeadLetterJob, &self.job_id).await?;
        let retries = self.retries;
        move_job(ctx, &job, EntityKind::DeadLetterJob, EntityKind::Job, move |job| {
            job.retries = retries;
            job.exception_message = None;
        })
        .await
    }
}

/// Moves due timers to the executable job table.
pub struct AcquireTimerJobsCmd {
    max_timers: usize,
}

impl AcquireTimerJobsCmd {
    pub fn new(max_timers: usize) -> Self {
        Self { max_timers }
    }
}

#[async_trait]
impl Command for AcquireTimerJobsCmd {
    type Output = Vec<JobEntity>;

    fn name(&self) -> &'static str {
        "org.flowable.job.service.impl.asyncexecutor.AcquireTimerJobsCmd"
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<Vec<JobEntity>> {
        let query = EntityQuery::TimerJobsToExecute(ctx.now());
        let due: Vec<JobEntity> = ctx.session.find_list_of(&query).await;
        let mut moved = Vec::new();
        for timer in due.into_iter().take(self.max_timers) {
            moved.push(move_job(ctx, &timer, EntityKind::TimerJob, EntityKind::Job, |_| {}).await?);
        }
        Ok(moved)
    }
}

/// Locks executable jobs for one owner.
pub struct AcquireJobsCmd {
    lock_owner: String,
    lock_time: Duration,
    max_jobs: usize,
}

impl AcquireJobsCmd {
    pub fn new(lock_owner: &str, lock_time: Duration, max_jobs: usize) -> Self {
        Self {
            lock_owner: lock_owner.to_string(),
            lock_time,
            max_jobs,
        }
    }
}

#[async_trait]
impl Command for AcquireJobsCmd {
    type Output = Vec<JobEntity>;

    fn name(&self) -> &'static str {
        "org.flowable.job.service.impl.asyncexecutor.AcquireJobsCmd"
    }

    async fn execute(&self, ctx: &mut CommandContext) -> Result<Vec<JobEntity>> {
        let now = ctx.now();
        let lock_time = chrono::Duration::from_std(self.lock_time)
            .map_err(|err| EngineError::IllegalArgument(format!("invalid lock time: {}", err)))?;
        let query = EntityQuery::JobsToExecute(now);
        let available: Vec<JobEntity> = ctx.session.find_list_of(&query).await;

        let mut acquired = Vec::new();
        for job in available.into_iter().take(self.max_jobs) {
            if let Some(locked) = ctx.session.get_mut_in::<JobEntity>(EntityKind::Job, &job.id) {
                locked.lock_owner = Some(self.lock_owner.clone());
                locked.lock_expiration = Some(now + lock_time);
                acquired.push(locked.clone());
            }
        }
        Ok(acquired)
    }
}
