use std::collections::BTreeMap;

use crate::cmd::{
    ExecuteJobCmd, GetTableCountCmd, JobRetryCmd, MoveDeadLetterJobToExecutableJobCmd,
    MoveTimerToExecutableJobCmd,
};
use crate::core::{EngineError, Result};
use crate::engine::ProcessEngine;
use crate::entity::{EntityKind, JobEntity};
use crate::query::JobQuery;

#[derive(Clone)]
pub struct ManagementService {
    engine: ProcessEngine,
}

impl ManagementService {
    pub fn new(engine: ProcessEngine) -> Self {
        Self { engine }
    }

    /// Executes a job. A failing job loses one retry in a separate command
    /// and the original error is returned.
    pub async fn execute_job(&self, job_id: &str) -> Result<()> {
        match self.engine.execute(&ExecuteJobCmd::new(job_id)).await {
            Ok(()) => Ok(()),
            Err(err) if is_job_failure(&err) => {
                let (kind, _) = self
                    .engine
                    .execute(&JobRetryCmd::new(job_id, &err.to_string()))
                    .await?;
                log::debug!("job {} failed, now a {:?}: {}", job_id, kind, err);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    pub fn create_job_query(&self) -> JobQuery {
        JobQuery::new(self.engine.clone(), EntityKind::Job)
    }

    pub fn create_timer_job_query(&self) -> JobQuery {
        JobQuery::new(self.engine.clone(), EntityKind::TimerJob)
    }

    pub fn create_suspended_job_query(&self) -> JobQuery {
        JobQuery::new(self.engine.clone(), EntityKind::SuspendedJob)
    }

    pub fn create_dead_letter_job_query(&self) -> JobQuery {
        JobQuery::new(self.engine.clone(), EntityKind::DeadLetterJob)
    }

    pub async fn move_timer_to_executable_job(&self, job_id: &str) -> Result<JobEntity> {
        self.engine.execute(&MoveTimerToExecutableJobCmd::new(job_id)).await
    }

    pub async fn move_dead_letter_job_to_executable_job(&self, job_id: &str, retries: i32) -> Result<JobEntity> {
        self.engine
            .execute(&MoveDeadLetterJobToExecutableJobCmd::new(job_id, retries))
            .await
    }

    /// Committed rows per entity class.
    pub async fn table_count(&self) -> Result<BTreeMap<String, usize>> {
        self.engine.execute(&GetTableCountCmd).await
    }
}

/// Errors raised while running the job's handler. A missing job or a
/// concurrent modification leaves the job untouched for the next attempt.
pub(crate) fn is_job_failure(err: &EngineError) -> bool {
    !matches!(
        err,
        EngineError::ObjectNotFound { .. }
            | EngineError::IllegalArgument(_)
            | EngineError::OptimisticLock(_)
            | EngineError::LockError(_)
    )
}
