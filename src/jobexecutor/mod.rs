//! Background job execution: due timers become executable jobs, executable
//! jobs are locked for this executor and run concurrently.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use crate::cmd::{AcquireJobsCmd, AcquireTimerJobsCmd};
use crate::core::{EngineError, Result};
use crate::engine::ProcessEngine;
use crate::query::Query;

/// Handle to a running executor. Dropping it aborts the worker.
pub struct AsyncExecutor {
    engine: ProcessEngine,
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl AsyncExecutor {
    /// Spawns the acquisition loop on the current tokio runtime.
    pub fn start(engine: ProcessEngine) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let poll_interval = engine.config().async_executor_poll_interval;
        let permits = Arc::new(Semaphore::new(engine.config().async_executor_max_concurrent_jobs));
        let worker_engine = engine.clone();

        log::debug!("async executor for '{}' started", engine.name());
        let join_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        break;
                    }
                    _ = sleep(poll_interval) => {
                        if let Err(err) = run_cycle(&worker_engine, &permits).await {
                            log::warn!("job acquisition failed: {}", err);
                        }
                    }
                }
            }
        });

        Self {
            engine,
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        }
    }

    pub fn is_active(&self) -> bool {
        self.join_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signals the worker to stop and waits for the running cycle to finish.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .await
                .map_err(|err| EngineError::ExecutionError(format!("async executor join: {}", err)))?;
        }
        log::debug!("async executor for '{}' stopped", self.engine.name());
        Ok(())
    }
}

impl Drop for AsyncExecutor {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

/// One acquisition round. Returns the number of jobs executed.
pub(crate) async fn run_cycle(engine: &ProcessEngine, permits: &Arc<Semaphore>) -> Result<usize> {
    let config = engine.config();
    let max_jobs = config.async_executor_max_concurrent_jobs;

    let timers = engine.execute(&AcquireTimerJobsCmd::new(max_jobs)).await?;
    if !timers.is_empty() {
        log::debug!("{} due timers moved to executable jobs", timers.len());
    }

    let acquire = AcquireJobsCmd::new(
        &config.async_executor_lock_owner,
        config.async_executor_lock_time,
        max_jobs,
    );
    let jobs = match engine.execute(&acquire).await {
        Ok(jobs) => jobs,
        Err(err) if err.is_optimistic_lock() => {
            log::warn!("jobs were acquired concurrently: {}", err);
            return Ok(0);
        }
        Err(err) => return Err(err),
    };

    let mut running = Vec::with_capacity(jobs.len());
    for job in jobs {
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| EngineError::ExecutionError(format!("job permits closed: {}", err)))?;
        let management = engine.management_service();
        running.push(tokio::spawn(async move {
            let _permit = permit;
            if let Err(err) = management.execute_job(&job.id).await {
                log::warn!("job {} failed: {}", job.id, err);
            }
        }));
    }

    let executed = running.len();
    for result in futures::future::join_all(running).await {
        if let Err(err) = result {
            log::warn!("job task panicked or was cancelled: {}", err);
        }
    }
    Ok(executed)
}

async fn jobs_available(engine: &ProcessEngine) -> Result<bool> {
    let management = engine.management_service();
    if management.create_job_query().count().await? > 0 {
        return Ok(true);
    }
    Ok(management.create_timer_job_query().count().await? > 0)
}

/// Runs an executor until no executable or timer jobs remain, polling every
/// `check_interval`. Fails with [`EngineError::Timeout`] after `max_wait`.
pub async fn wait_for_job_executor_to_process_all_jobs(
    engine: &ProcessEngine,
    max_wait: Duration,
    check_interval: Duration,
) -> Result<()> {
    let executor = AsyncExecutor::start(engine.clone());
    let waited = timeout(max_wait, async {
        loop {
            sleep(check_interval).await;
            if !jobs_available(engine).await? {
                return Ok::<(), EngineError>(());
            }
        }
    })
    .await;
    executor.shutdown().await?;

    match waited {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout(format!(
            "time limit of {}ms was exceeded",
            max_wait.as_millis()
        ))),
    }
}
